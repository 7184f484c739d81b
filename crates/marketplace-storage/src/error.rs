//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur when reading or writing the key-value store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file exists but does not hold a key-value map.
    #[error("Corrupt store at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Backend-specific failure.
    #[error("Store operation failed: {0}")]
    Backend(String),
}
