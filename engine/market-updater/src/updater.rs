//! The periodic reprice loop

use std::collections::HashMap;
use std::sync::Arc;

use portfolio_service::PortfolioService;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MarketConfig;

/// Background loop repricing every active session's holdings
pub struct MarketUpdater {
    portfolio: Arc<PortfolioService>,
    config: MarketConfig,
}

impl MarketUpdater {
    pub fn new(portfolio: Arc<PortfolioService>, config: MarketConfig) -> Self {
        Self { portfolio, config }
    }

    /// Synthesize prices for the given symbols: a random walk around
    /// each symbol's base price, clamped by the configured volatility,
    /// rounded to cents.
    pub fn mock_prices(&self, symbols: &[String]) -> HashMap<String, f64> {
        let mut rng = rand::thread_rng();
        symbols
            .iter()
            .map(|symbol| {
                let base = self
                    .config
                    .base_prices
                    .get(symbol)
                    .copied()
                    .unwrap_or(self.config.default_price);
                let jitter = base * rng.gen_range(-self.config.volatility..=self.config.volatility);
                (symbol.clone(), ((base + jitter) * 100.0).round() / 100.0)
            })
            .collect()
    }

    /// Run until cancelled. The stop signal takes effect at the next
    /// suspension point, also mid-tick, without finishing the tick's
    /// remaining sessions.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Market updater started (interval={}s)", self.config.interval_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }
        }
        info!("Market updater stopped");
    }

    /// One pass over all live sessions
    pub async fn tick(&self) {
        let session_ids = match self.portfolio.list_sessions().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to enumerate sessions: {}", e);
                return;
            }
        };

        for session_id in session_ids {
            // Sessions can expire between enumeration and read; skip them
            let state = match self.portfolio.get(&session_id).await {
                Ok(Some(state)) => state,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read session {}: {}", session_id, e);
                    continue;
                }
            };

            if state.holdings.is_empty() {
                continue;
            }

            let symbols: Vec<String> = state.holdings.keys().cloned().collect();
            let prices = self.mock_prices(&symbols);

            match self.portfolio.apply_prices(&session_id, &prices).await {
                Ok(Some(updated)) => debug!(
                    "Repriced session {}: total_value={:.2}",
                    session_id, updated.total_value
                ),
                Ok(None) => debug!("Session {} expired before reprice", session_id),
                Err(e) => warn!("Reprice failed for session {}: {}", session_id, e),
            }
        }
    }
}
