//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while encoding or inspecting a slideshow.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found")]
    FfmpegNotFound,

    #[error("FFprobe not found")]
    FfprobeNotFound,

    #[error("FFmpeg {reason}")]
    Encode {
        reason: String,
        /// Last non-progress stderr lines
        stderr_tail: Option<String>,
    },

    #[error("Could not inspect {path}: {reason}")]
    Inspect { path: PathBuf, reason: String },

    #[error("Slideshow needs at least {needed} images, got {got}")]
    NotEnoughImages { got: usize, needed: usize },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),
}

impl MediaError {
    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
            stderr_tail: None,
        }
    }

    pub fn inspect(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Inspect {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach captured stderr to an encode failure; other errors pass through.
    pub fn with_stderr(self, tail: String) -> Self {
        match self {
            Self::Encode { reason, .. } if !tail.is_empty() => Self::Encode {
                reason,
                stderr_tail: Some(tail),
            },
            other => other,
        }
    }
}
