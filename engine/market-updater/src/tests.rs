//! Unit tests for price synthesis and the reprice tick

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use portfolio_service::{PortfolioService, SessionDefaults};
use session_store::MemorySessionStore;
use tokio_util::sync::CancellationToken;

use crate::{MarketConfig, MarketUpdater};

fn updater_with(portfolio: Arc<PortfolioService>) -> MarketUpdater {
    MarketUpdater::new(portfolio, MarketConfig::default())
}

fn standalone_updater() -> MarketUpdater {
    let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
    updater_with(Arc::new(PortfolioService::new(store, SessionDefaults::default())))
}

mod price_tests {
    use super::*;

    #[test]
    fn test_mock_prices_known_symbol_range() {
        let updater = standalone_updater();
        for _ in 0..50 {
            let prices = updater.mock_prices(&["AAPL".to_string()]);
            let price = prices["AAPL"];
            assert!((185.0 * 0.98..=185.0 * 1.02).contains(&price));
        }
    }

    #[test]
    fn test_mock_prices_unknown_symbol_uses_default_base() {
        let updater = standalone_updater();
        let prices = updater.mock_prices(&["XYZ".to_string()]);
        assert!((100.0 * 0.98..=100.0 * 1.02).contains(&prices["XYZ"]));
    }

    #[test]
    fn test_mock_prices_round_to_cents() {
        let updater = standalone_updater();
        let symbols: Vec<String> =
            ["AAPL", "GOOGL", "MSFT"].iter().map(|s| s.to_string()).collect();
        for price in updater.mock_prices(&symbols).values() {
            assert_eq!(*price, (price * 100.0).round() / 100.0);
        }
    }

    #[test]
    fn test_mock_prices_covers_all_symbols() {
        let updater = standalone_updater();
        let symbols: Vec<String> =
            ["AAPL", "GOOGL", "MSFT", "TSLA"].iter().map(|s| s.to_string()).collect();
        let prices = updater.mock_prices(&symbols);
        assert_eq!(prices.len(), symbols.len());
    }

    #[test]
    fn test_mock_prices_empty() {
        let updater = standalone_updater();
        assert!(updater.mock_prices(&[]).is_empty());
    }
}

mod tick_tests {
    use super::*;

    #[tokio::test]
    async fn test_tick_reprices_held_sessions_and_skips_empty() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let held =
            Arc::new(PortfolioService::new(store.clone(), SessionDefaults::default()));
        let empty = Arc::new(PortfolioService::new(
            store,
            SessionDefaults { holdings: HashMap::new(), initial_total_value: 500.0 },
        ));

        held.ensure_session("held").await.unwrap();
        empty.ensure_session("empty").await.unwrap();
        let empty_before = empty.get("empty").await.unwrap().unwrap();

        updater_with(held.clone()).tick().await;

        // Held session repriced once into the expected band:
        // AAPL 100x185 + GOOGL 50x140 + MSFT 75x375 = 53625, within 2%
        let repriced = held.get("held").await.unwrap().unwrap();
        assert!((53625.0 * 0.98..=53625.0 * 1.02).contains(&repriced.total_value));

        // Empty session untouched: no reprice write happened
        let empty_after = empty.get("empty").await.unwrap().unwrap();
        assert_eq!(empty_after.total_value, empty_before.total_value);
        assert_eq!(empty_after.last_activity, empty_before.last_activity);
    }

    #[tokio::test]
    async fn test_tick_with_no_sessions_is_a_no_op() {
        let updater = standalone_updater();
        updater.tick().await;
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let portfolio =
            Arc::new(PortfolioService::new(store, SessionDefaults::default()));
        let updater = MarketUpdater::new(
            portfolio,
            MarketConfig { interval_secs: 3600, ..Default::default() },
        );

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { updater.run(cancel).await })
        };

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("updater should exit promptly on cancel")
            .unwrap();
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_market_config_defaults() {
        let config = MarketConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.base_prices["AAPL"], 185.0);
        assert_eq!(config.default_price, 100.0);
        assert_eq!(config.volatility, 0.02);
    }
}
