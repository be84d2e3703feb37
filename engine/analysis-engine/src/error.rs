//! Error types for the analysis engine

use thiserror::Error;

/// Result type for analysis engine operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced to the caller requesting an analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Portfolio(#[from] portfolio_service::PortfolioError),
}

/// Failure inside a single metric unit
///
/// Isolated per unit: logged and dropped, never aborts sibling units.
#[derive(Error, Debug)]
#[error("Metric computation failed: {0}")]
pub struct MetricError(pub String);
