//! Collision-free object names and declared content-type handling shared by
//! the ingest pipelines.

use crate::errors::{ServiceError, ServiceResult};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

const RANDOM_NAME_BYTES: usize = 32;

/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub fn random_name() -> String {
    let mut bytes = [0u8; RANDOM_NAME_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Reduce a declared `Content-Type` to its lowercased media type, dropping
/// any parameters.
pub fn media_type(content_type: Option<&str>) -> ServiceResult<String> {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.split_once('/') {
        Some((kind, sub)) if !kind.is_empty() && !sub.is_empty() && !sub.contains('/') => {
            Ok(essence)
        }
        _ => Err(ServiceError::Validation(format!(
            "invalid content type `{}`",
            content_type.unwrap_or_default()
        ))),
    }
}
