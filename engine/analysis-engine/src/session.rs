//! Per-session analysis lifecycle
//!
//! Holds the single "current run" reference for a session and enforces
//! the total ordering the system depends on: a new analysis never takes
//! its snapshot until the previous run's cancel-and-drain completes.

use std::sync::Arc;

use portfolio_service::PortfolioService;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{AnalysisError, Result};
use crate::orchestrator::{AnalysisOrchestrator, AnalysisOutcome, ResultSink};

struct RunningAnalysis {
    symbol: String,
    cancel: CancellationToken,
    handle: JoinHandle<AnalysisOutcome>,
}

/// State machine driving one session's analyses
pub struct AnalysisSession {
    session_id: String,
    portfolio: Arc<PortfolioService>,
    orchestrator: Arc<AnalysisOrchestrator>,
    current: Option<RunningAnalysis>,
}

impl AnalysisSession {
    pub fn new(
        session_id: String,
        portfolio: Arc<PortfolioService>,
        orchestrator: Arc<AnalysisOrchestrator>,
    ) -> Self {
        Self { session_id, portfolio, orchestrator, current: None }
    }

    /// Start analyzing a symbol, cancelling and draining any analysis
    /// already in flight first.
    ///
    /// Returns `SessionNotFound` without mutating anything when the
    /// session does not exist in the store.
    pub async fn analyze(&mut self, symbol: &str, sink: Arc<dyn ResultSink>) -> Result<()> {
        self.cancel_current().await;

        let snapshot = self
            .portfolio
            .begin_analysis(&self.session_id, symbol)
            .await?
            .ok_or_else(|| AnalysisError::SessionNotFound(self.session_id.clone()))?;
        let snapshot = Arc::new(snapshot);

        info!("Starting analysis of {} for session {}", symbol, self.session_id);

        let cancel = CancellationToken::new();
        let handle = {
            let orchestrator = Arc::clone(&self.orchestrator);
            let session_id = self.session_id.clone();
            let symbol = symbol.to_string();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                orchestrator.run(&session_id, &symbol, snapshot, sink, cancel).await
            })
        };

        self.current = Some(RunningAnalysis { symbol: symbol.to_string(), cancel, handle });
        Ok(())
    }

    /// Cancel the in-flight analysis, if any, and wait for every one of
    /// its units to reach a terminal state.
    pub async fn cancel_current(&mut self) -> Option<AnalysisOutcome> {
        let run = self.current.take()?;
        run.cancel.cancel();
        match run.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    "Analysis task for session {} ({}) failed to join: {}",
                    self.session_id, run.symbol, e
                );
                None
            }
        }
    }

    /// Wait for the in-flight analysis to finish without cancelling it.
    pub async fn wait_current(&mut self) -> Option<AnalysisOutcome> {
        let run = self.current.take()?;
        match run.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    "Analysis task for session {} ({}) failed to join: {}",
                    self.session_id, run.symbol, e
                );
                None
            }
        }
    }

    /// Tear down the session: cancel and drain anything in flight.
    pub async fn shutdown(&mut self) {
        if self.cancel_current().await.is_some() {
            info!("Session {} analysis drained on shutdown", self.session_id);
        }
    }
}
