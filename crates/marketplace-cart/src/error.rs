//! Cart error types.

use marketplace_storage::StorageError;
use thiserror::Error;

/// Errors that can occur in cart operations.
#[derive(Error, Debug)]
pub enum CartError {
    /// The store was used outside its active scope (before hydration or
    /// after close). This is a programming error.
    #[error("Cart store used outside its active scope: {0}")]
    Usage(String),

    /// The durable store failed to read or write.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// The stored snapshot could not be parsed as a cart.
    #[error("Malformed cart snapshot: {0}")]
    MalformedSnapshot(String),

    /// The configuration can't be used for the requested operation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in quantity calculation")]
    Overflow,
}

impl From<serde_json::Error> for CartError {
    fn from(e: serde_json::Error) -> Self {
        CartError::MalformedSnapshot(e.to_string())
    }
}
