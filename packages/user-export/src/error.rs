//! Typed errors for the export pipeline.

use std::path::PathBuf;

use identity_client::IdentityError;
use thiserror::Error;

/// Errors that end an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Missing or invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// A page could not be fetched or parsed
    #[error("failed to fetch page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: IdentityError,
    },

    /// Output file could not be created or written
    #[error("failed to write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker ended a job without reporting its outcome
    #[error("worker error: {0}")]
    Worker(String),
}

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
