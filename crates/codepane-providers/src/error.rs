//! Error types for the providers module

use thiserror::Error;

/// Errors surfaced by provider configuration and code generation
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ProviderError {
    /// Missing or invalid provider fields, or an empty prompt
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport-level failure (DNS, refused connection, timeout)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Backend answered with a non-success status
    #[error("{}", http_status_message(.status, .body))]
    HttpStatus { status: u16, body: String },

    /// Backend answered but no code could be extracted
    #[error("The model response did not include JavaScript output.")]
    EmptyResponse,

    /// Provider not found by ID
    #[error("Provider not found: {0}")]
    NotFound(String),

    /// No enabled provider is available
    #[error("No AI provider is enabled")]
    NoActiveProvider,

    /// A generation request is already outstanding
    #[error("A generation request is already in progress")]
    Busy,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn http_status_message(status: &u16, body: &str) -> String {
    if body.is_empty() {
        format!("Request failed ({})", status)
    } else {
        format!("Request failed ({}): {}", status, body)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::SerializationError(err.to_string())
    }
}

impl From<crate::transport::TransportError> for ProviderError {
    fn from(err: crate::transport::TransportError) -> Self {
        ProviderError::NetworkError(err.to_string())
    }
}
