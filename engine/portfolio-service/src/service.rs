//! Typed pass-throughs to the store's atomic transactions

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use session_store::SessionStore;
use tracing::debug;

use crate::error::Result;
use crate::types::{CurrentAnalysis, MetricResult, PortfolioState, SessionDefaults};

/// Domain-level wrapper around the session store
///
/// All methods stamp `Utc::now()` and return the consistent state
/// snapshot the store hands back; the transaction methods return `None`
/// when the session does not exist.
pub struct PortfolioService {
    store: Arc<dyn SessionStore>,
    defaults: SessionDefaults,
}

impl PortfolioService {
    pub fn new(store: Arc<dyn SessionStore>, defaults: SessionDefaults) -> Self {
        Self { store, defaults }
    }

    /// Create the session with default-populated state if absent and
    /// return whatever is stored afterwards.
    pub async fn ensure_session(&self, session_id: &str) -> Result<PortfolioState> {
        let initial = PortfolioState::new(session_id, &self.defaults);
        let raw = self.store.init(session_id, &serde_json::to_string(&initial)?).await?;
        debug!("Ensured session {}", session_id);
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read current state (refreshes the TTL). Does not create.
    pub async fn get(&self, session_id: &str) -> Result<Option<PortfolioState>> {
        let raw = self.store.read(session_id).await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    /// All live session ids; used by the market updater.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        Ok(self.store.list_sessions().await?)
    }

    /// Mark a new analysis as started and return the state snapshot
    /// every metric unit of that analysis will share.
    pub async fn begin_analysis(
        &self,
        session_id: &str,
        symbol: &str,
    ) -> Result<Option<PortfolioState>> {
        let now = Utc::now();
        let marker = CurrentAnalysis { symbol: symbol.to_string(), started_at: now };
        let raw = self
            .store
            .start_analysis(session_id, &serde_json::to_string(&marker)?, now)
            .await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    /// Append one completed metric result.
    pub async fn record_result(
        &self,
        session_id: &str,
        result: &MetricResult,
    ) -> Result<Option<PortfolioState>> {
        let raw = self
            .store
            .append_result(session_id, &serde_json::to_string(result)?, Utc::now())
            .await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    /// Recompute `total_value` from the latest prices.
    pub async fn apply_prices(
        &self,
        session_id: &str,
        prices: &HashMap<String, f64>,
    ) -> Result<Option<PortfolioState>> {
        let raw = self
            .store
            .update_market(session_id, &serde_json::to_string(prices)?, Utc::now())
            .await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }
}
