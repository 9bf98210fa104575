//! Signed-URL resolver: swaps a video's stored reference for a short-lived
//! presigned playback URL in the copy handed back to callers.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::video::Video,
    services::object_storage::ObjectStorage,
};
use std::{sync::Arc, time::Duration};

pub const PLAYBACK_URL_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct SignedUrlResolver {
    storage: Arc<dyn ObjectStorage>,
}

impl SignedUrlResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Videos without a reference pass through unchanged; a malformed
    /// reference is an integrity error, never treated as absent.
    pub async fn resolve(&self, mut video: Video) -> ServiceResult<Video> {
        let Some(reference) = video.reference()? else {
            return Ok(video);
        };

        let url = self
            .storage
            .presign_get(&reference.bucket, &reference.key, PLAYBACK_URL_TTL)
            .await
            .map_err(ServiceError::Signing)?;

        video.video_url = Some(url);
        Ok(video)
    }

    /// Resolve every video; the first failure fails the whole batch.
    pub async fn resolve_all(&self, videos: Vec<Video>) -> ServiceResult<Vec<Video>> {
        let mut resolved = Vec::with_capacity(videos.len());
        for video in videos {
            resolved.push(self.resolve(video).await?);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::video::sample, services::object_storage::fake::MemoryObjectStorage};
    use uuid::Uuid;

    #[tokio::test]
    async fn presigns_stored_bucket_and_key() {
        let storage = Arc::new(MemoryObjectStorage::default());
        let resolver = SignedUrlResolver::new(storage.clone());
        let mut video = sample(Uuid::new_v4());
        video.video_url = Some("bucket-x,key-y".into());

        let resolved = resolver.resolve(video).await.unwrap();

        let presigned = storage.presigned.lock().unwrap().clone();
        assert_eq!(
            presigned,
            vec![("bucket-x".to_string(), "key-y".to_string(), PLAYBACK_URL_TTL)]
        );
        let url = resolved.video_url.unwrap();
        assert_ne!(url, "bucket-x,key-y");
        assert!(url.contains("X-Amz-Expires=900"));
    }

    #[tokio::test]
    async fn absent_reference_passes_through() {
        let storage = Arc::new(MemoryObjectStorage::default());
        let resolver = SignedUrlResolver::new(storage.clone());

        let video = sample(Uuid::new_v4());
        assert_eq!(resolver.resolve(video.clone()).await.unwrap(), video);

        let mut empty = sample(Uuid::new_v4());
        empty.video_url = Some(String::new());
        assert_eq!(resolver.resolve(empty.clone()).await.unwrap(), empty);

        assert!(storage.presigned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_reference_is_rejected() {
        let resolver = SignedUrlResolver::new(Arc::new(MemoryObjectStorage::default()));
        for raw in ["no-comma", "a,b,c"] {
            let mut video = sample(Uuid::new_v4());
            video.video_url = Some(raw.into());
            assert!(matches!(
                resolver.resolve(video).await,
                Err(ServiceError::InvalidReference(_))
            ));
        }
    }

    #[tokio::test]
    async fn resolve_all_fails_on_first_corrupt_row() {
        let resolver = SignedUrlResolver::new(Arc::new(MemoryObjectStorage::default()));
        let owner = Uuid::new_v4();
        let mut good = sample(owner);
        good.video_url = Some("media,landscape/a.mp4".into());
        let mut bad = sample(owner);
        bad.video_url = Some("corrupt".into());

        assert!(resolver.resolve_all(vec![good.clone()]).await.is_ok());
        assert!(resolver.resolve_all(vec![good, bad]).await.is_err());
    }
}
