//! Local staging helpers: streaming an upload body to disk and removing
//! request-owned scratch files on every exit path.

use crate::errors::{ServiceError, ServiceResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};

/// Copy `stream` into `file` chunk by chunk, then flush and fsync.
///
/// A failing body stream (client disconnect, body limit exceeded) is bad
/// input; a failing write is a local I/O error.
pub async fn write_stream<S>(file: &mut File, stream: S) -> ServiceResult<u64>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut size_bytes: u64 = 0;
    pin_mut!(stream);
    while let Some(chunk_res) = stream.next().await {
        let chunk = chunk_res
            .map_err(|err| ServiceError::Validation(format!("failed to read upload: {err}")))?;
        size_bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(size_bytes)
}

/// Deletes the file at `path` when dropped.
#[derive(Debug)]
pub struct ScratchPath {
    path: PathBuf,
}

impl ScratchPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand the path to the caller.
    pub fn keep(mut self) -> PathBuf {
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchPath {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed scratch file {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "failed to remove scratch file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn writes_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.bin");
        let mut file = File::create(&path).await.unwrap();

        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);
        let size = write_stream(&mut file, chunks).await.unwrap();

        assert_eq!(size, 11);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn body_errors_are_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("upload.bin")).await.unwrap();

        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("length limit exceeded")),
        ]);
        let err = write_stream(&mut file, chunks).await.unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn scratch_path_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.mp4.processing");
        std::fs::write(&path, b"x").unwrap();

        drop(ScratchPath::new(&path));
        assert!(!path.exists());

        // Already gone is fine.
        drop(ScratchPath::new(&path));
    }

    #[test]
    fn kept_scratch_path_survives_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.mp4.processing");
        std::fs::write(&path, b"x").unwrap();

        let kept = ScratchPath::new(&path).keep();

        assert_eq!(kept, path);
        assert!(path.exists());
    }
}
