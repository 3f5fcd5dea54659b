//! Error types for reqlog.

use thiserror::Error;

/// Result type alias using reqlog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reqlog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Sink rejected a batch (non-database backends)
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
