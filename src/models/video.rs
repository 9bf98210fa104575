//! Represents a video record and the parameters used to create one.

use crate::models::reference::{ObjectReference, ReferenceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for a single uploaded video.
///
/// `video_url` holds the persisted `{bucket},{key}` reference, never a
/// playback URL. Use [`Video::reference`] to decode it; responses carry the
/// resolved form produced by the signed-URL resolver instead.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Unique identifier for this video.
    pub id: Uuid,

    /// When the metadata row was created.
    pub created_at: DateTime<Utc>,

    /// Bumped on every thumbnail or video ingest.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// Plain, non-expiring URL under the static asset path.
    pub thumbnail_url: Option<String>,

    /// Stored object-store reference (or, in a resolved copy, a signed URL).
    pub video_url: Option<String>,

    /// Owner of the video; the only user allowed to mutate it.
    pub user_id: Uuid,
}

/// Request body for `POST /api/videos`.
#[derive(Deserialize, Debug, Clone)]
pub struct CreateVideoParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Video {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Decode the stored video reference.
    ///
    /// `None` or an empty string means no video has been published yet.
    pub fn reference(&self) -> Result<Option<ObjectReference>, ReferenceError> {
        match self.video_url.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    /// Point the record at a freshly uploaded object and bump `updated_at`.
    pub fn publish(&mut self, reference: &ObjectReference) {
        self.video_url = Some(reference.to_string());
        self.updated_at = Utc::now();
    }

    pub fn set_thumbnail(&mut self, url: String) {
        self.thumbnail_url = Some(url);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
pub(crate) fn sample(owner: Uuid) -> Video {
    let now = Utc::now();
    Video {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: "sample".into(),
        description: String::new(),
        thumbnail_url: None,
        video_url: None,
        user_id: owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reference_is_absent() {
        let mut video = sample(Uuid::new_v4());
        assert_eq!(video.reference().unwrap(), None);

        video.video_url = Some(String::new());
        assert_eq!(video.reference().unwrap(), None);
    }

    #[test]
    fn publish_stores_comma_joined_reference() {
        let mut video = sample(Uuid::new_v4());
        let before = video.updated_at;
        let reference = ObjectReference::new("tubely-media", "landscape/abc.mp4");

        video.publish(&reference);

        assert_eq!(
            video.video_url.as_deref(),
            Some("tubely-media,landscape/abc.mp4")
        );
        assert!(video.updated_at >= before);
        assert_eq!(video.reference().unwrap(), Some(reference));
    }

    #[test]
    fn malformed_reference_is_an_error() {
        let mut video = sample(Uuid::new_v4());
        video.video_url = Some("https://example.com/video.mp4".into());
        assert!(video.reference().is_err());
    }
}
