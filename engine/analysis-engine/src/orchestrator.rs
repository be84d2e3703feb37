//! Concurrent metric orchestration for one analysis run

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use portfolio_service::{MetricResult, PortfolioService, PortfolioState};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AnalysisConfig;
use crate::metrics::Metric;

/// Error type for result sinks
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receives each metric result as it completes
///
/// Delivery happens from concurrent metric units; a slow or failing
/// sink delays its own unit but never corrupts orchestration or
/// cancellation.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, result: &MetricResult) -> Result<(), SinkError>;
}

/// Terminal state of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Every metric unit completed
    Completed,
    /// Stopped intentionally; not a fault
    Cancelled,
}

/// Runs every configured metric concurrently against one snapshot
pub struct AnalysisOrchestrator {
    portfolio: Arc<PortfolioService>,
    metrics: Vec<Arc<dyn Metric>>,
    max_concurrent: usize,
}

impl AnalysisOrchestrator {
    pub fn new(
        portfolio: Arc<PortfolioService>,
        metrics: Vec<Arc<dyn Metric>>,
        config: &AnalysisConfig,
    ) -> Self {
        Self { portfolio, metrics, max_concurrent: config.max_concurrent.max(1) }
    }

    /// Run one analysis to a terminal state.
    ///
    /// All units read the same snapshot, so every metric sees an
    /// identical portfolio view even if the store mutates concurrently.
    /// On cancellation every not-yet-finished unit is stopped and the
    /// whole group is drained before this returns; units that finish
    /// while the cancel races them still persist their result.
    pub async fn run(
        &self,
        session_id: &str,
        symbol: &str,
        snapshot: Arc<PortfolioState>,
        sink: Arc<dyn ResultSink>,
        cancel: CancellationToken,
    ) -> AnalysisOutcome {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut units = JoinSet::new();

        for metric in &self.metrics {
            let portfolio = Arc::clone(&self.portfolio);
            let metric = Arc::clone(metric);
            let snapshot = Arc::clone(&snapshot);
            let sink = Arc::clone(&sink);
            let semaphore = Arc::clone(&semaphore);
            let session_id = session_id.to_string();
            let symbol = symbol.to_string();

            units.spawn(async move {
                // The semaphore is never closed while units run
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                run_unit(portfolio, metric, &session_id, &symbol, &snapshot, sink).await;
            });
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cancelling analysis of {} for session {}", symbol, session_id);
                    units.abort_all();
                    // Drain: every unit must reach a terminal state
                    // before we report cancellation complete
                    while units.join_next().await.is_some() {}
                    info!("Analysis of {} cancelled for session {}", symbol, session_id);
                    return AnalysisOutcome::Cancelled;
                }
                joined = units.join_next() => match joined {
                    None => {
                        info!("Analysis of {} completed for session {}", symbol, session_id);
                        return AnalysisOutcome::Completed;
                    }
                    Some(Ok(())) => {}
                    Some(Err(e)) if e.is_cancelled() => {}
                    Some(Err(e)) => error!("Metric unit panicked: {}", e),
                },
            }
        }
    }
}

/// Compute one metric, persist it, and stream it to the sink.
///
/// Failures here are isolated: a failed computation, persist, or sink
/// delivery is logged and must not prevent sibling units from
/// completing and persisting their own results.
async fn run_unit(
    portfolio: Arc<PortfolioService>,
    metric: Arc<dyn Metric>,
    session_id: &str,
    symbol: &str,
    snapshot: &PortfolioState,
    sink: Arc<dyn ResultSink>,
) {
    let value = match metric.compute(symbol, snapshot).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Metric {} failed for {}: {}", metric.name(), symbol, e);
            return;
        }
    };

    let result = MetricResult {
        symbol: symbol.to_string(),
        metric: metric.name().to_string(),
        value,
        timestamp: Utc::now(),
    };

    match portfolio.record_result(session_id, &result).await {
        Ok(Some(_)) => {}
        Ok(None) => warn!("Session {} expired before {} result persisted", session_id, metric.name()),
        Err(e) => warn!("Failed to persist {} result for session {}: {}", metric.name(), session_id, e),
    }

    if let Err(e) = sink.deliver(&result).await {
        warn!("Result sink rejected {} for session {}: {}", metric.name(), session_id, e);
    }
}
