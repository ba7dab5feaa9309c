//! Error types for the event store

use thiserror::Error;

/// Result type alias for event store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the event store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database driver errors (connection, SQL, constraint)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (creating the data directory, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store is temporarily unable to accept writes
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Invalid operation for current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Timeout errors
    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl StoreError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
