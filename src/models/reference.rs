//! The persisted (bucket, key) pair identifying an uploaded video object.

use std::{fmt, str::FromStr};
use thiserror::Error;

const DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid bucket/key reference `{0}`")]
pub struct ReferenceError(pub String);

/// Location of an object in the object store.
///
/// Stored in the metadata row as `{bucket},{key}`; that encoding is only
/// produced and consumed by the `Display` and `FromStr` impls below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    pub bucket: String,
    pub key: String,
}

impl ObjectReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.bucket, DELIMITER, self.key)
    }
}

impl FromStr for ObjectReference {
    type Err = ReferenceError;

    /// Exactly two non-empty components are accepted.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split(DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(bucket), Some(key), None) if !bucket.is_empty() && !key.is_empty() => {
                Ok(Self::new(bucket, key))
            }
            _ => Err(ReferenceError(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_key() {
        let reference: ObjectReference = "bucket-x,key-y".parse().unwrap();
        assert_eq!(reference.bucket, "bucket-x");
        assert_eq!(reference.key, "key-y");
        assert_eq!(reference.to_string(), "bucket-x,key-y");
    }

    #[test]
    fn keys_may_contain_slashes() {
        let reference: ObjectReference = "media,portrait/abc_-.mp4".parse().unwrap();
        assert_eq!(reference.key, "portrait/abc_-.mp4");
    }

    #[test]
    fn rejects_wrong_component_count() {
        for raw in ["no-delimiter", "a,b,c", ",", "bucket,", ",key", ""] {
            assert_eq!(
                raw.parse::<ObjectReference>(),
                Err(ReferenceError(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }
}
