//! Unit tests for orchestration, cancellation ordering, and the mock
//! metrics, run against the in-memory session store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portfolio_service::{MetricResult, PortfolioService, PortfolioState, SessionDefaults};
use session_store::MemorySessionStore;

use crate::metrics::{standard_metrics, Metric};
use crate::orchestrator::{AnalysisOrchestrator, AnalysisOutcome, ResultSink, SinkError};
use crate::session::AnalysisSession;
use crate::{AnalysisConfig, AnalysisError, MetricError};

fn portfolio() -> Arc<PortfolioService> {
    let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
    Arc::new(PortfolioService::new(store, SessionDefaults::default()))
}

fn zero_delay_config() -> AnalysisConfig {
    AnalysisConfig { delay_range_secs: (0.0, 0.0), ..Default::default() }
}

fn session_with(
    portfolio: &Arc<PortfolioService>,
    metrics: Vec<Arc<dyn Metric>>,
) -> AnalysisSession {
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        Arc::clone(portfolio),
        metrics,
        &zero_delay_config(),
    ));
    AnalysisSession::new("s1".to_string(), Arc::clone(portfolio), orchestrator)
}

/// Collects delivered results
#[derive(Default)]
struct VecSink {
    results: Mutex<Vec<MetricResult>>,
}

impl VecSink {
    fn collected(&self) -> Vec<MetricResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for VecSink {
    async fn deliver(&self, result: &MetricResult) -> Result<(), SinkError> {
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// Always rejects delivery
struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    async fn deliver(&self, _result: &MetricResult) -> Result<(), SinkError> {
        Err("sink offline".into())
    }
}

/// Completes immediately
struct InstantMetric;

#[async_trait]
impl Metric for InstantMetric {
    fn name(&self) -> &'static str {
        "instant"
    }

    async fn compute(&self, _: &str, _: &PortfolioState) -> Result<f64, MetricError> {
        Ok(1.0)
    }
}

/// Never completes on its own; only cancellation ends it
struct StalledMetric {
    name: &'static str,
}

#[async_trait]
impl Metric for StalledMetric {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn compute(&self, _: &str, _: &PortfolioState) -> Result<f64, MetricError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(0.0)
    }
}

/// Always fails the computation
struct BrokenMetric;

#[async_trait]
impl Metric for BrokenMetric {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn compute(&self, _: &str, _: &PortfolioState) -> Result<f64, MetricError> {
        Err(MetricError("model blew up".to_string()))
    }
}

/// Logs the symbol it was started for; stalls for any symbol but "B"
struct SwitchProbe {
    name: &'static str,
    started: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Metric for SwitchProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn compute(&self, symbol: &str, _: &PortfolioState) -> Result<f64, MetricError> {
        self.started.lock().unwrap().push(symbol.to_string());
        if symbol != "B" {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(0.0)
    }
}

mod orchestration_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_metrics_complete_and_persist() {
        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let sink = Arc::new(VecSink::default());
        let mut session = session_with(&portfolio, standard_metrics(&zero_delay_config()));

        session.analyze("AAPL", sink.clone()).await.unwrap();
        assert_eq!(session.wait_current().await, Some(AnalysisOutcome::Completed));

        let delivered = sink.collected();
        assert_eq!(delivered.len(), 5);
        assert!(delivered.iter().all(|r| r.symbol == "AAPL"));
        let names: std::collections::HashSet<_> =
            delivered.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(
            names,
            ["portfolio_risk", "concentration", "correlation", "momentum", "allocation_score"]
                .into_iter()
                .collect()
        );

        let state = portfolio.get("s1").await.unwrap().unwrap();
        assert_eq!(state.analysis_results.len(), 5);
    }

    #[tokio::test]
    async fn test_analyze_missing_session_reports_not_found() {
        let portfolio = portfolio();
        let sink = Arc::new(VecSink::default());
        let mut session = session_with(&portfolio, vec![Arc::new(InstantMetric)]);

        let err = session.analyze("AAPL", sink.clone()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::SessionNotFound(_)));

        // Nothing created, nothing persisted, nothing delivered
        assert!(portfolio.list_sessions().await.unwrap().is_empty());
        assert!(sink.collected().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_flight_drains_with_partial_results() {
        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let sink = Arc::new(VecSink::default());

        let metrics: Vec<Arc<dyn Metric>> = vec![
            Arc::new(InstantMetric),
            Arc::new(StalledMetric { name: "stall_a" }),
            Arc::new(StalledMetric { name: "stall_b" }),
            Arc::new(StalledMetric { name: "stall_c" }),
            Arc::new(StalledMetric { name: "stall_d" }),
        ];
        let mut session = session_with(&portfolio, metrics);

        session.analyze("AAPL", sink).await.unwrap();
        // Let the instant metric land before cancelling
        tokio::time::sleep(Duration::from_millis(100)).await;

        let outcome = session.cancel_current().await;
        assert_eq!(outcome, Some(AnalysisOutcome::Cancelled));

        let persisted = portfolio.get("s1").await.unwrap().unwrap().analysis_results;
        assert!(!persisted.is_empty() && persisted.len() < 5);
    }

    #[tokio::test]
    async fn test_switch_waits_for_drain_before_new_snapshot() {
        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let sink = Arc::new(VecSink::default());
        let started = Arc::new(Mutex::new(Vec::new()));

        let metrics: Vec<Arc<dyn Metric>> = ["p1", "p2", "p3"]
            .into_iter()
            .map(|name| {
                Arc::new(SwitchProbe { name, started: Arc::clone(&started) }) as Arc<dyn Metric>
            })
            .collect();
        let mut session = session_with(&portfolio, metrics);

        session.analyze("A", sink.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        session.analyze("B", sink.clone()).await.unwrap();
        assert_eq!(session.wait_current().await, Some(AnalysisOutcome::Completed));

        // No unit for the old symbol may start once the new symbol's
        // units begin
        let log = started.lock().unwrap().clone();
        let first_b = log.iter().position(|s| s == "B").expect("B units should have started");
        assert!(log[first_b..].iter().all(|s| s == "B"));
        assert_eq!(log[first_b..].len(), 3);

        // Only the new symbol's results were delivered
        assert!(sink.collected().iter().all(|r| r.symbol == "B"));
    }

    #[tokio::test]
    async fn test_metric_failure_is_isolated() {
        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let sink = Arc::new(VecSink::default());

        let metrics: Vec<Arc<dyn Metric>> =
            vec![Arc::new(BrokenMetric), Arc::new(InstantMetric)];
        let mut session = session_with(&portfolio, metrics);

        session.analyze("AAPL", sink.clone()).await.unwrap();
        assert_eq!(session.wait_current().await, Some(AnalysisOutcome::Completed));

        // The broken unit is dropped; the healthy sibling still lands
        let delivered = sink.collected();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].metric, "instant");
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_block_completion() {
        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let mut session = session_with(&portfolio, standard_metrics(&zero_delay_config()));

        session.analyze("AAPL", Arc::new(FailingSink)).await.unwrap();
        assert_eq!(session.wait_current().await, Some(AnalysisOutcome::Completed));

        // Persistence happened even though every delivery failed
        let state = portfolio.get("s1").await.unwrap().unwrap();
        assert_eq!(state.analysis_results.len(), 5);
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_enforced() {
        struct ConcurrencyProbe {
            name: &'static str,
            active: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Metric for ConcurrencyProbe {
            fn name(&self) -> &'static str {
                self.name
            }

            async fn compute(&self, _: &str, _: &PortfolioState) -> Result<f64, MetricError> {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(0.0)
            }
        }

        let portfolio = portfolio();
        portfolio.ensure_session("s1").await.unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let metrics: Vec<Arc<dyn Metric>> = ["c1", "c2", "c3", "c4", "c5"]
            .into_iter()
            .map(|name| {
                Arc::new(ConcurrencyProbe {
                    name,
                    active: Arc::clone(&active),
                    peak: Arc::clone(&peak),
                }) as Arc<dyn Metric>
            })
            .collect();

        let config = AnalysisConfig { max_concurrent: 2, ..zero_delay_config() };
        let orchestrator =
            Arc::new(AnalysisOrchestrator::new(Arc::clone(&portfolio), metrics, &config));
        let mut session =
            AnalysisSession::new("s1".to_string(), Arc::clone(&portfolio), orchestrator);

        session.analyze("AAPL", Arc::new(VecSink::default())).await.unwrap();
        assert_eq!(session.wait_current().await, Some(AnalysisOutcome::Completed));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}

mod metric_tests {
    use super::*;

    fn snapshot() -> PortfolioState {
        PortfolioState::new("s1", &SessionDefaults::default())
    }

    #[tokio::test]
    async fn test_concentration_equals_holding_weight() {
        let metrics = standard_metrics(&zero_delay_config());
        let concentration =
            metrics.iter().find(|m| m.name() == "concentration").unwrap();
        let value = concentration.compute("AAPL", &snapshot()).await.unwrap();
        let expected = (100.0 / 225.0 * 10_000.0_f64).round() / 10_000.0;
        assert_eq!(value, expected);
    }

    #[tokio::test]
    async fn test_allocation_score_direction() {
        let metrics = standard_metrics(&zero_delay_config());
        let allocation =
            metrics.iter().find(|m| m.name() == "allocation_score").unwrap();
        // GOOGL is underweight (50/225 < 1/3), AAPL overweight (100/225 > 1/3)
        assert!(allocation.compute("GOOGL", &snapshot()).await.unwrap() > 0.0);
        assert!(allocation.compute("AAPL", &snapshot()).await.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn test_metric_value_ranges() {
        let metrics = standard_metrics(&zero_delay_config());
        let state = snapshot();
        let weight = state.holding_weight("AAPL");

        for _ in 0..20 {
            for metric in &metrics {
                let value = metric.compute("AAPL", &state).await.unwrap();
                match metric.name() {
                    "portfolio_risk" => {
                        assert!(value >= 0.1 * weight - 1e-4 && value <= 0.5 * weight + 1e-4)
                    }
                    "correlation" => assert!((-0.3 - 1e-4..=0.9 + 1e-4).contains(&value)),
                    "momentum" => assert!(value.abs() <= weight + 1e-4),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_standard_metrics_follow_config() {
        let config = AnalysisConfig {
            metrics: vec!["momentum".to_string(), "correlation".to_string()],
            ..zero_delay_config()
        };
        let metrics = standard_metrics(&config);
        let names: Vec<_> = metrics.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"momentum"));
        assert!(names.contains(&"correlation"));
    }

    #[test]
    fn test_analysis_config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.metrics.len(), 5);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.delay_range_secs, (2.0, 5.0));
    }
}
