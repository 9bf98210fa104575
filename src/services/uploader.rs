//! Durable upload coordinator: rewinds and re-sends a local stream until the
//! object store accepts it or the attempt budget runs out.

use crate::services::object_storage::{ObjectStorage, ObjectStoreError};
use std::{io, io::SeekFrom, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt};
use tracing::{info, warn};

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to rewind upload body before attempt {attempt}: {source}")]
    Rewind {
        attempt: u32,
        #[source]
        source: io::Error,
    },
    #[error("upload failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ObjectStoreError,
    },
}

#[derive(Clone)]
pub struct DurableUploader {
    storage: Arc<dyn ObjectStorage>,
}

impl DurableUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Upload all of `body` to `bucket/key`.
    ///
    /// The body is rewound to its start before every attempt. Attempt `n`
    /// waits `n - 1` seconds first; a rewind failure aborts immediately.
    pub async fn upload<R>(
        &self,
        body: &mut R,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<(), UploadError>
    where
        R: AsyncRead + AsyncSeek + Send + Unpin,
    {
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                tokio::time::sleep(backoff(attempt)).await;
            }

            body.seek(SeekFrom::Start(0))
                .await
                .map_err(|source| UploadError::Rewind { attempt, source })?;

            match self.storage.put(bucket, key, &mut *body, content_type).await {
                Ok(()) => {
                    info!(bucket, key, attempt, "upload complete");
                    return Ok(());
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    warn!(bucket, key, attempt, error = %err, "upload attempt failed");
                    attempt += 1;
                }
                Err(source) => {
                    warn!(bucket, key, attempt, error = %source, "upload attempt failed");
                    return Err(UploadError::Exhausted {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

/// Linear backoff: 1s before attempt 2, 2s before attempt 3.
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::object_storage::fake::MemoryObjectStorage;
    use std::{
        io::Cursor,
        pin::Pin,
        sync::atomic::Ordering,
        task::{Context, Poll},
    };
    use tokio::time::Instant;

    const BUCKET: &str = "tubely-media";
    const KEY: &str = "landscape/abc.mp4";

    #[test]
    fn backoff_is_linear() {
        assert_eq!(backoff(1), Duration::ZERO);
        assert_eq!(backoff(2), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_does_not_sleep() {
        let storage = Arc::new(MemoryObjectStorage::default());
        let uploader = DurableUploader::new(storage.clone());
        let mut body = Cursor::new(b"payload".to_vec());

        let started = Instant::now();
        uploader.upload(&mut body, BUCKET, KEY, "video/mp4").await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(storage.put_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_transient_failures_with_full_body() {
        let storage = Arc::new(MemoryObjectStorage::failing(2));
        let uploader = DurableUploader::new(storage.clone());
        let payload = b"0123456789abcdef".to_vec();
        let mut body = Cursor::new(payload.clone());

        let started = Instant::now();
        uploader.upload(&mut body, BUCKET, KEY, "video/mp4").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(storage.put_attempts.load(Ordering::SeqCst), 3);

        let objects = storage.objects();
        assert_eq!(objects.len(), 1);
        let stored = &objects[&(BUCKET.to_string(), KEY.to_string())];
        assert_eq!(stored.body, payload, "retry must not upload a truncated body");
        assert_eq!(stored.content_type, "video/mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_last_error_and_creates_nothing() {
        let storage = Arc::new(MemoryObjectStorage::failing(3));
        let uploader = DurableUploader::new(storage.clone());
        let mut body = Cursor::new(b"payload".to_vec());

        let err = uploader
            .upload(&mut body, BUCKET, KEY, "video/mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Exhausted { attempts: 3, .. }));
        assert_eq!(storage.put_attempts.load(Ordering::SeqCst), 3);
        assert!(storage.objects().is_empty());
    }

    struct Unseekable(Cursor<Vec<u8>>);

    impl AsyncRead for Unseekable {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_read(cx, buf)
        }
    }

    impl AsyncSeek for Unseekable {
        fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "not seekable"))
        }

        fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Poll::Ready(Ok(0))
        }
    }

    #[tokio::test]
    async fn rewind_failure_aborts_without_uploading() {
        let storage = Arc::new(MemoryObjectStorage::default());
        let uploader = DurableUploader::new(storage.clone());
        let mut body = Unseekable(Cursor::new(b"payload".to_vec()));

        let err = uploader
            .upload(&mut body, BUCKET, KEY, "video/mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Rewind { attempt: 1, .. }));
        assert_eq!(storage.put_attempts.load(Ordering::SeqCst), 0);
    }
}
