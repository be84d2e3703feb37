//! PortfolioService - typed session state over the session store
//!
//! The only component that knows the session's structural shape. It
//! serializes the domain types to store documents, stamps timestamps,
//! and forwards every mutation to the store's atomic transactions.

mod error;
mod service;
mod types;

pub use error::{PortfolioError, Result};
pub use service::PortfolioService;
pub use types::{CurrentAnalysis, MetricResult, PortfolioState, SessionDefaults};
