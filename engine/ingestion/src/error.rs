//! Error types for the ingestion pipeline

use crate::buffer::BufferFull;
use crate::validator::ValidationError;
use event_store::StoreError;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Errors surfaced by the ingestion pipeline
#[derive(Error, Debug)]
pub enum IngestionError {
    /// The payload failed validation; the client must fix it
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The buffer is at capacity; the client should retry with backoff
    #[error("{0}")]
    BufferFull(#[from] BufferFull),

    /// Storage errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestionError {
    /// Whether the client may succeed by retrying the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BufferFull(_))
    }
}
