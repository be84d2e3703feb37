//! Service state and component lifecycle

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use analysis_engine::{standard_metrics, AnalysisOrchestrator};
use market_updater::MarketUpdater;
use portfolio_gateway::GatewayServer;
use portfolio_service::PortfolioService;
use session_store::{MemorySessionStore, RedisSessionStore, SessionStore};

use crate::config::{ServiceConfig, StoreBackend};

/// Shared state for all service components
pub struct ServiceState {
    pub config: ServiceConfig,
    pub store: Arc<dyn SessionStore>,
    pub portfolio: Arc<PortfolioService>,
    pub orchestrator: Arc<AnalysisOrchestrator>,
    market_updater: MarketUpdater,
    gateway: GatewayServer,
    cancel: CancellationToken,
}

impl ServiceState {
    /// Build every component from configuration
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let store = Self::create_store(&config).await?;

        let portfolio =
            Arc::new(PortfolioService::new(Arc::clone(&store), config.session_defaults.clone()));

        let metrics = standard_metrics(&config.analysis);
        info!("Loaded {} analysis metrics", metrics.len());
        let orchestrator =
            Arc::new(AnalysisOrchestrator::new(Arc::clone(&portfolio), metrics, &config.analysis));

        let market_updater = MarketUpdater::new(Arc::clone(&portfolio), config.market.clone());

        let gateway = GatewayServer::new(
            config.gateway.clone(),
            Arc::clone(&portfolio),
            Arc::clone(&orchestrator),
        );

        Ok(Self {
            config,
            store,
            portfolio,
            orchestrator,
            market_updater,
            gateway,
            cancel: CancellationToken::new(),
        })
    }

    async fn create_store(config: &ServiceConfig) -> Result<Arc<dyn SessionStore>> {
        match config.store.backend {
            StoreBackend::Redis => {
                let store = RedisSessionStore::new(config.store.store.clone())
                    .await
                    .with_context(|| {
                        format!("Failed to connect to Redis at {}", config.store.store.url)
                    })?;
                store.ping().await.context("Redis did not respond to PING")?;
                info!("Connected to Redis at {}", config.store.store.url);
                Ok(Arc::new(store))
            }
            StoreBackend::Memory => {
                info!("Using in-memory session store");
                Ok(Arc::new(MemorySessionStore::new(config.store.store.session_ttl())))
            }
        }
    }

    /// Run the market updater until shutdown is requested
    pub async fn start_market_updater(&self) {
        self.market_updater.run(self.cancel.child_token()).await;
    }

    /// Run the WebSocket gateway until shutdown is requested
    pub async fn start_gateway(&self) -> Result<()> {
        self.gateway.run(self.cancel.child_token()).await?;
        Ok(())
    }

    /// Request shutdown of all running components
    pub fn begin_shutdown(&self) {
        self.cancel.cancel();
    }
}
