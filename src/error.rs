use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to decode {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("Signature {index} has zero norm")]
    DegenerateSignature { index: usize },

    #[error("Failed to delete {path}: {source}")]
    DeletionFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("External tool unavailable: {message}")]
    ToolUnavailable { message: String },

    #[error("History error: {0}")]
    History(#[from] serde_json::Error),
}

impl DedupeError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DedupeError::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupeError>;
