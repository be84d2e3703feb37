//! Portfolio Analysis Production Service
//!
//! Main entry point for the live portfolio analysis platform. It wires
//! the session store, analysis engine, market updater, and WebSocket
//! gateway together and provides graceful shutdown handling.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use portfolio_analysis_service::{
    graceful_shutdown, initialize_logging, load_configuration, setup_signal_handlers, ServiceState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging first
    initialize_logging()?;

    info!("Starting Portfolio Analysis Service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_configuration().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Create service state
    let service_state = Arc::new(ServiceState::new(config).await?);
    info!("Service state initialized");

    // Setup signal handlers for graceful shutdown
    let shutdown_signal = setup_signal_handlers(service_state.clone())?;
    info!("Signal handlers configured");

    // Start the market updater in a separate task
    info!("Starting market updater...");
    let market_handle = {
        let state = service_state.clone();
        tokio::spawn(async move {
            state.start_market_updater().await;
        })
    };

    // Start the WebSocket gateway in a separate task
    info!("Starting gateway...");
    let gateway_handle = {
        let state = service_state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.start_gateway().await {
                error!("Gateway failed: {}", e);
            }
        })
    };

    // Wait for shutdown signal
    info!("Portfolio Analysis Service is running. Press Ctrl+C to shutdown gracefully.");
    let _ = shutdown_signal.await;

    // Graceful shutdown
    info!("Shutdown signal received. Initiating graceful shutdown...");
    graceful_shutdown(service_state, market_handle, gateway_handle).await?;

    info!("Portfolio Analysis Service shutdown complete");
    Ok(())
}
