//! Fast-start rewriter: remuxes an MP4 with `ffmpeg -movflags faststart`
//! so the `moov` index precedes the media payload.

use crate::services::staging::ScratchPath;
use async_trait::async_trait;
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Appended to the input path to form the rewritten sibling.
pub const OUTPUT_SUFFIX: &str = ".processing";

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("{binary} exited with {status}: {stderr}")]
    Exit {
        binary: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Produces a fast-start copy of a local MP4 next to the input.
///
/// The input is left untouched; the caller owns both files.
#[async_trait]
pub trait MediaRewriter: Send + Sync {
    async fn fast_start(&self, input: &Path) -> Result<PathBuf, RemuxError>;
}

/// `input.mp4` -> `input.mp4.processing`
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut raw: OsString = input.as_os_str().to_owned();
    raw.push(OUTPUT_SUFFIX);
    PathBuf::from(raw)
}

/// `ffmpeg`-backed rewriter doing a stream copy (no re-encode).
#[derive(Debug, Clone)]
pub struct FfmpegFastStart {
    binary: String,
}

impl FfmpegFastStart {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaRewriter for FfmpegFastStart {
    async fn fast_start(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        // Removed on failure and when the request is dropped mid-remux.
        let output = ScratchPath::new(output_path_for(input));

        let result = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(output.path())
            .kill_on_drop(true)
            .output()
            .await;

        match result {
            Ok(run) if run.status.success() => {
                debug!(output = %output.path().display(), "fast-start rewrite complete");
                Ok(output.keep())
            }
            Ok(run) => Err(RemuxError::Exit {
                binary: self.binary.clone(),
                status: run.status,
                stderr: String::from_utf8_lossy(&run.stderr).trim().to_string(),
            }),
            Err(source) => Err(RemuxError::Spawn {
                binary: self.binary.clone(),
                source,
            }),
        }
    }
}
