//! Configuration for the analysis engine

use serde::{Deserialize, Serialize};

/// Configuration for one session's analysis runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Metric names to run per analysis
    pub metrics: Vec<String>,

    /// Maximum metric units computing at once
    pub max_concurrent: usize,

    /// Simulated computation latency range in seconds (mock metrics)
    pub delay_range_secs: (f64, f64),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            metrics: vec![
                "portfolio_risk".to_string(),
                "concentration".to_string(),
                "correlation".to_string(),
                "momentum".to_string(),
                "allocation_score".to_string(),
            ],
            max_concurrent: 5,
            delay_range_secs: (2.0, 5.0),
        }
    }
}
