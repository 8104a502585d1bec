//! Error types for the capture crate

use thiserror::Error;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors that can occur while capturing console output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::Serialization {
            message: err.to_string(),
        }
    }
}
