//! Pluggable metric strategies
//!
//! The built-in metrics are mocks: each simulates a bounded computation
//! latency and returns a bounded value derived from the portfolio
//! snapshot. Production metrics implement the same [`Metric`] trait
//! with real computation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use portfolio_service::PortfolioState;
use rand::Rng;

use crate::config::AnalysisConfig;
use crate::error::MetricError;

/// A single analysis metric over a session snapshot
#[async_trait]
pub trait Metric: Send + Sync {
    /// Stable metric name used in persisted results
    fn name(&self) -> &'static str;

    /// Compute the metric for one symbol against a fixed snapshot
    async fn compute(&self, symbol: &str, snapshot: &PortfolioState)
        -> Result<f64, MetricError>;
}

/// Sleep a uniform duration inside the configured latency window
async fn simulate_latency(range: (f64, f64)) {
    let (min, max) = range;
    if max <= 0.0 {
        return;
    }
    let secs = {
        let mut rng = rand::thread_rng();
        rng.gen_range(min..=max)
    };
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Risk contribution of a symbol, scaled by its portfolio weight
pub struct PortfolioRisk {
    delay_range: (f64, f64),
}

#[async_trait]
impl Metric for PortfolioRisk {
    fn name(&self) -> &'static str {
        "portfolio_risk"
    }

    async fn compute(
        &self,
        symbol: &str,
        snapshot: &PortfolioState,
    ) -> Result<f64, MetricError> {
        simulate_latency(self.delay_range).await;
        let weight = snapshot.holding_weight(symbol);
        let factor = rand::thread_rng().gen_range(0.1..=0.5);
        Ok(round4(weight * factor))
    }
}

/// Fraction of the portfolio held in the symbol
pub struct Concentration {
    delay_range: (f64, f64),
}

#[async_trait]
impl Metric for Concentration {
    fn name(&self) -> &'static str {
        "concentration"
    }

    async fn compute(
        &self,
        symbol: &str,
        snapshot: &PortfolioState,
    ) -> Result<f64, MetricError> {
        simulate_latency(self.delay_range).await;
        Ok(round4(snapshot.holding_weight(symbol)))
    }
}

/// Correlation of the symbol against the rest of the portfolio
pub struct Correlation {
    delay_range: (f64, f64),
}

#[async_trait]
impl Metric for Correlation {
    fn name(&self) -> &'static str {
        "correlation"
    }

    async fn compute(&self, _symbol: &str, _snapshot: &PortfolioState)
        -> Result<f64, MetricError> {
        simulate_latency(self.delay_range).await;
        Ok(round4(rand::thread_rng().gen_range(-0.3..=0.9)))
    }
}

/// Momentum signal weighted by position size
pub struct Momentum {
    delay_range: (f64, f64),
}

#[async_trait]
impl Metric for Momentum {
    fn name(&self) -> &'static str {
        "momentum"
    }

    async fn compute(
        &self,
        symbol: &str,
        snapshot: &PortfolioState,
    ) -> Result<f64, MetricError> {
        simulate_latency(self.delay_range).await;
        let weight = snapshot.holding_weight(symbol);
        let direction = rand::thread_rng().gen_range(-1.0..=1.0);
        Ok(round4(direction * weight))
    }
}

/// Distance from an equal-weight allocation
///
/// Positive means the position is underweight, negative overweight.
pub struct AllocationScore {
    delay_range: (f64, f64),
}

#[async_trait]
impl Metric for AllocationScore {
    fn name(&self) -> &'static str {
        "allocation_score"
    }

    async fn compute(
        &self,
        symbol: &str,
        snapshot: &PortfolioState,
    ) -> Result<f64, MetricError> {
        simulate_latency(self.delay_range).await;
        let weight = snapshot.holding_weight(symbol);
        let ideal = 1.0 / snapshot.holdings.len().max(1) as f64;
        Ok(round4(ideal - weight))
    }
}

/// Build the configured subset of the standard mock metrics
pub fn standard_metrics(config: &AnalysisConfig) -> Vec<Arc<dyn Metric>> {
    let delay_range = config.delay_range_secs;
    let all: Vec<Arc<dyn Metric>> = vec![
        Arc::new(PortfolioRisk { delay_range }),
        Arc::new(Concentration { delay_range }),
        Arc::new(Correlation { delay_range }),
        Arc::new(Momentum { delay_range }),
        Arc::new(AllocationScore { delay_range }),
    ];
    all.into_iter().filter(|m| config.metrics.iter().any(|name| name == m.name())).collect()
}
