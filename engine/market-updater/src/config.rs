//! Configuration for the market updater

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for mock market updates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Seconds between update ticks
    pub interval_secs: u64,

    /// Base price per known symbol
    pub base_prices: HashMap<String, f64>,

    /// Base price for symbols not in `base_prices`
    pub default_price: f64,

    /// Maximum relative deviation of a synthesized price from its base
    pub volatility: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            base_prices: HashMap::from([
                ("AAPL".to_string(), 185.0),
                ("GOOGL".to_string(), 140.0),
                ("MSFT".to_string(), 375.0),
                ("AMZN".to_string(), 155.0),
                ("TSLA".to_string(), 200.0),
                ("META".to_string(), 390.0),
                ("NVDA".to_string(), 650.0),
            ]),
            default_price: 100.0,
            volatility: 0.02,
        }
    }
}

impl MarketConfig {
    /// Update interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
