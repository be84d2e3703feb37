//! AnalysisEngine - parallel metric computation with cancel-and-drain
//!
//! Given a consistent snapshot of session state, the orchestrator runs
//! every configured metric concurrently, persists each result as it
//! lands, and streams it to a result sink. The per-session
//! [`AnalysisSession`] guarantees that starting a new analysis first
//! cancels and fully drains the previous one.

mod config;
mod error;
mod metrics;
mod orchestrator;
mod session;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, MetricError, Result};
pub use metrics::{standard_metrics, Metric};
pub use orchestrator::{AnalysisOrchestrator, AnalysisOutcome, ResultSink, SinkError};
pub use session::AnalysisSession;

#[cfg(test)]
mod tests;
