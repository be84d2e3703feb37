//! WebSocket server accept loop

use std::sync::Arc;

use analysis_engine::AnalysisOrchestrator;
use portfolio_service::PortfolioService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::connection::ConnectionHandler;
use crate::error::{GatewayError, GatewayResult};

/// The gateway server: accepts connections and spawns one handler each
pub struct GatewayServer {
    config: GatewayConfig,
    portfolio: Arc<PortfolioService>,
    orchestrator: Arc<AnalysisOrchestrator>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        portfolio: Arc<PortfolioService>,
        orchestrator: Arc<AnalysisOrchestrator>,
    ) -> Self {
        Self { config, portfolio, orchestrator }
    }

    /// Run the accept loop until cancelled
    pub async fn run(&self, cancel: CancellationToken) -> GatewayResult<()> {
        let addr = self
            .config
            .server_addr()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        let listener = TcpListener::bind(addr).await?;
        info!("Gateway listening on {}", addr);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Gateway stopped");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let handler = ConnectionHandler::new(
                        peer_addr,
                        Arc::clone(&self.portfolio),
                        Arc::clone(&self.orchestrator),
                    );
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(stream).await {
                            warn!("Connection from {} ended with error: {}", peer_addr, e);
                        }
                    });
                }
            }
        }
    }
}
