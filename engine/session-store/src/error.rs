//! Error types for the session store

use thiserror::Error;

/// Result type for session store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur at the store boundary
///
/// A missing session is not an error; read and transaction methods
/// return `Option::None` for absent keys.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt session document: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        StoreError::Corrupt(msg.into())
    }
}
