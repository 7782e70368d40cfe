use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::store::Store;

/// Graceful shutdown coordinator for the NEXUS server
pub struct ShutdownCoordinator {
    store: Arc<dyn Store>,
    metrics_enabled: bool,
}

impl ShutdownCoordinator {
    pub fn new(store: Arc<dyn Store>, metrics_enabled: bool) -> Self {
        Self {
            store,
            metrics_enabled,
        }
    }

    /// Resolves on Ctrl-C or SIGTERM. Passed to axum's graceful shutdown.
    pub async fn wait_for_signal() {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl-C"),
            _ = terminate => info!("Received SIGTERM"),
        }
        info!("Draining in-flight requests before shutdown");
    }

    /// Perform graceful shutdown operations once the listener has stopped
    pub async fn shutdown_all_services(self) -> Result<()> {
        info!("Initiating graceful shutdown of all services...");

        if self.metrics_enabled {
            crate::observability::service_metrics().log_stats();
        }

        match timeout(Duration::from_secs(5), self.store.close()).await {
            Ok(()) => info!("Store closed"),
            Err(_) => warn!("Timeout waiting for the store to close"),
        }

        info!("Graceful shutdown completed successfully");
        Ok(())
    }
}
