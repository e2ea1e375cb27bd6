use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Per-frame detection misses and oversized contours are not errors; they
/// degrade to "no update this tick".
#[derive(Debug, Error)]
pub enum IrlError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid color range for {ball}: {reason}")]
    InvalidColorRange { ball: String, reason: String },

    #[error("unknown ball: {0}")]
    UnknownBall(String),

    #[error("calibration has no entry for ball {0}")]
    MissingBall(String),

    #[error("frame size mismatch: expected {expected:?}, got {actual:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("video source: {0}")]
    VideoSource(String),

    #[error("teardown failed: {0}")]
    Teardown(String),
}

impl IrlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IrlError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IrlError>;
