//! Session state stored per client session

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker for the analysis presently in flight for a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentAnalysis {
    /// Symbol under analysis
    pub symbol: String,

    /// When the analysis was started
    pub started_at: DateTime<Utc>,
}

/// One completed metric computation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricResult {
    /// Symbol the metric was computed for
    pub symbol: String,

    /// Metric name
    pub metric: String,

    /// Computed value
    pub value: f64,

    /// When the computation finished
    pub timestamp: DateTime<Utc>,
}

/// Full session state, one per session id
///
/// `holdings` is authoritative; `total_value` is a cache recomputed
/// only by the reprice transaction. `analysis_results` is append-only
/// for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub session_id: String,
    pub holdings: HashMap<String, u64>,
    pub total_value: f64,
    #[serde(default)]
    pub current_analysis: Option<CurrentAnalysis>,
    #[serde(default)]
    pub analysis_results: Vec<MetricResult>,
    pub last_activity: DateTime<Utc>,
}

impl PortfolioState {
    /// Default-populated state for a new session
    pub fn new(session_id: &str, defaults: &SessionDefaults) -> Self {
        Self {
            session_id: session_id.to_string(),
            holdings: defaults.holdings.clone(),
            total_value: defaults.initial_total_value,
            current_analysis: None,
            analysis_results: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    /// Fraction of the portfolio in a symbol, by share count
    pub fn holding_weight(&self, symbol: &str) -> f64 {
        let total_shares: u64 = self.holdings.values().sum();
        if total_shares == 0 {
            return 0.0;
        }
        self.holdings.get(symbol).copied().unwrap_or(0) as f64 / total_shares as f64
    }
}

/// Starting state for newly created sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub holdings: HashMap<String, u64>,
    pub initial_total_value: f64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            holdings: HashMap::from([
                ("AAPL".to_string(), 100),
                ("GOOGL".to_string(), 50),
                ("MSFT".to_string(), 75),
            ]),
            initial_total_value: 125_000.00,
        }
    }
}
