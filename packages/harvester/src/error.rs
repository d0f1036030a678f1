//! Typed errors for the harvester library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure categories when deciding whether to retry.

use thiserror::Error;

/// Errors that can occur while harvesting a page or persisting a record.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Network failure, timeout, or malformed response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body could not be decompressed
    #[error("decode error: {0}")]
    Decode(String),

    /// Embedded-state blob or named collection absent from the page
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed embedded document
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Record failed a structural check before persistence
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for HarvestError {
    fn from(e: sqlx::Error) -> Self {
        HarvestError::Storage(Box::new(e))
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvestError>;
