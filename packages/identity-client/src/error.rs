//! Error types for the identity client.

use thiserror::Error;

/// Result type for identity client operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

/// Identity client errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Configuration error (client could not be built, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout, body read failed)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API error (non-2xx response)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IdentityError {
    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            IdentityError::Api { status, .. } => Some(*status),
            IdentityError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
