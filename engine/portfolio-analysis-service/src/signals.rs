//! Signal handling for graceful shutdown

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::service::ServiceState;

/// Setup signal handlers for graceful shutdown
pub fn setup_signal_handlers(_service_state: Arc<ServiceState>) -> Result<oneshot::Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let (signal_tx, mut signal_rx) = mpsc::channel::<&'static str>(2);

    // Handle Ctrl+C (SIGINT)
    {
        let signal_tx = signal_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C signal: {}", e);
                return;
            }
            let _ = signal_tx.send("SIGINT").await;
        });
    }

    // Handle SIGTERM (Unix only)
    #[cfg(unix)]
    tokio::spawn(async move {
        use signal_hook::consts::SIGTERM;
        use std::sync::atomic::{AtomicBool, Ordering};

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let shutdown_flag_clone = shutdown_flag.clone();

        // Register signal handler
        if let Err(e) = signal_hook::flag::register(SIGTERM, shutdown_flag_clone) {
            error!("Failed to register SIGTERM handler: {}", e);
            return;
        }

        // Poll for signal
        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                let _ = signal_tx.send("SIGTERM").await;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    });

    // First signal wins
    tokio::spawn(async move {
        if let Some(name) = signal_rx.recv().await {
            info!("{} signal received", name);
            let _ = shutdown_tx.send(());
        }
    });

    Ok(shutdown_rx)
}

/// Graceful shutdown handler
pub async fn graceful_shutdown(
    service_state: Arc<ServiceState>,
    market_handle: tokio::task::JoinHandle<()>,
    gateway_handle: tokio::task::JoinHandle<()>,
) -> Result<()> {
    info!("Starting graceful shutdown...");

    // Signal all components to stop
    service_state.begin_shutdown();

    // Wait for the market updater task to complete with timeout
    let shutdown_timeout = Duration::from_secs(service_state.config.service.shutdown_timeout_secs);
    match timeout(shutdown_timeout, market_handle).await {
        Ok(Ok(())) => {
            info!("Market updater stopped gracefully");
        }
        Ok(Err(e)) => {
            error!("Market updater task failed: {}", e);
        }
        Err(_) => {
            warn!("Market updater did not stop within timeout, forcing shutdown");
        }
    }

    // Wait for the gateway task to complete with timeout
    match timeout(shutdown_timeout, gateway_handle).await {
        Ok(Ok(())) => {
            info!("Gateway stopped gracefully");
        }
        Ok(Err(e)) => {
            error!("Gateway task failed: {}", e);
        }
        Err(_) => {
            warn!("Gateway did not stop within timeout, forcing shutdown");
        }
    }

    info!("Graceful shutdown complete");
    Ok(())
}
