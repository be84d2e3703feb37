//! Error types for the portfolio service

use thiserror::Error;

/// Result type for portfolio service operations
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors that can occur translating session state to and from the store
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error(transparent)]
    Store(#[from] session_store::StoreError),

    #[error("Session document did not deserialize: {0}")]
    Serialization(#[from] serde_json::Error),
}
