//! Media prober: asks `ffprobe` for stream geometry and buckets a video by
//! aspect ratio.

use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, io, path::Path};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

const LANDSCAPE_RATIO: f64 = 16.0 / 9.0;
const PORTRAIT_RATIO: f64 = 9.0 / 16.0;
const RATIO_TOLERANCE: f64 = 0.1;

#[derive(Debug, Error)]
pub enum ProbeError {
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
    #[error("failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Coarse geometry bucket, also used as the object key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    /// Classify `width / height` against 16:9 and 9:16 with an inclusive
    /// tolerance of 0.1. Zero dimensions classify as `Other`.
    pub fn classify(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::Other;
        }
        let ratio = f64::from(width) / f64::from(height);
        if (ratio - LANDSCAPE_RATIO).abs() <= RATIO_TOLERANCE {
            Self::Landscape
        } else if (ratio - PORTRAIT_RATIO).abs() <= RATIO_TOLERANCE {
            Self::Portrait
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width and height of the first video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Inspects a local media file without modifying it.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    /// Dimensions of the first video stream, or `None` when the file reports
    /// no usable video stream.
    async fn video_dimensions(&self, path: &Path) -> Result<Option<Dimensions>, ProbeError>;

    async fn aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError> {
        Ok(self
            .video_dimensions(path)
            .await?
            .map_or(AspectRatio::Other, |d| AspectRatio::classify(d.width, d.height)))
    }
}

/// `ffprobe`-backed inspector.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    binary: String,
}

impl FfprobeInspector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn video_dimensions(&self, path: &Path) -> Result<Option<Dimensions>, ProbeError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Exit {
                binary: self.binary.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let dimensions = parse_probe_output(&output.stdout)?;
        debug!(path = %path.display(), ?dimensions, "probed video");
        Ok(dimensions)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Pick the first video stream from `-print_format json -show_streams` output.
///
/// Streams without a `codec_type` are treated as video.
pub(crate) fn parse_probe_output(stdout: &[u8]) -> Result<Option<Dimensions>, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;
    let dimensions = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
        .and_then(|s| match (s.width, s.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Some(Dimensions { width, height })
            }
            _ => None,
        });
    Ok(dimensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_resolutions() {
        assert_eq!(AspectRatio::classify(1280, 720), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(1920, 1080), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(720, 1280), AspectRatio::Portrait);
        assert_eq!(AspectRatio::classify(1080, 1920), AspectRatio::Portrait);
        assert_eq!(AspectRatio::classify(640, 480), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(1000, 1000), AspectRatio::Other);
    }

    #[test]
    fn tolerance_is_inclusive() {
        // 1.865 and 0.5 sit inside the band.
        assert_eq!(AspectRatio::classify(1865, 1000), AspectRatio::Landscape);
        assert_eq!(AspectRatio::classify(500, 1000), AspectRatio::Portrait);
        // 1.9 and 0.4 fall outside.
        assert_eq!(AspectRatio::classify(1900, 1000), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(400, 1000), AspectRatio::Other);
    }

    #[test]
    fn zero_dimensions_are_other() {
        assert_eq!(AspectRatio::classify(0, 720), AspectRatio::Other);
        assert_eq!(AspectRatio::classify(1280, 0), AspectRatio::Other);
    }

    #[test]
    fn picks_first_video_stream() {
        let stdout = br#"{"streams":[
            {"index":0,"codec_type":"audio","channels":2},
            {"index":1,"codec_type":"video","width":1280,"height":720}
        ]}"#;
        assert_eq!(
            parse_probe_output(stdout).unwrap(),
            Some(Dimensions {
                width: 1280,
                height: 720
            })
        );
    }

    #[test]
    fn no_streams_is_not_an_error() {
        assert_eq!(parse_probe_output(br#"{"streams":[]}"#).unwrap(), None);
        assert_eq!(parse_probe_output(b"{}").unwrap(), None);
        assert_eq!(
            parse_probe_output(br#"{"streams":[{"codec_type":"video","width":0,"height":720}]}"#)
                .unwrap(),
            None
        );
    }

    #[test]
    fn garbage_output_fails() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_is_a_probe_failure() {
        let inspector = FfprobeInspector::new("tubely-definitely-not-ffprobe");
        let err = inspector
            .aspect_ratio(Path::new("/nonexistent.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }
}
