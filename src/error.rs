//! Error types for score-based image organization.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, OrganizerError>;

#[derive(Debug, thiserror::Error)]
pub enum OrganizerError {
    #[error("invalid threshold {value}: {reason}")]
    InvalidThreshold { value: f64, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid score {0}: must be a finite number")]
    InvalidScore(f64),

    #[error("invalid annotation position: {0:?}")]
    InvalidPosition(String),

    #[error("invalid font size {0}: must be between 1 and {max}", max = crate::annotate::MAX_FONT_SIZE)]
    InvalidFontSize(i32),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("failed to relocate {} to {}: {reason}", src.display(), dest.display())]
    Relocation {
        src: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    #[error("no anomaly score for {}", .0.display())]
    MissingScore(PathBuf),

    #[error("predictor failed: {0}")]
    Predictor(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrganizerError {
    /// Configuration-class errors abort a run before any image is processed;
    /// everything else is reported per item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OrganizerError::InvalidThreshold { .. }
                | OrganizerError::Configuration(_)
                | OrganizerError::InvalidPosition(_)
                | OrganizerError::InvalidFontSize(_)
        )
    }
}

impl From<toml::de::Error> for OrganizerError {
    fn from(err: toml::de::Error) -> Self {
        OrganizerError::Configuration(err.to_string())
    }
}
