use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::api;
use crate::config::config;
use crate::database::open_store;
use crate::service::{ServiceSettings, TravelerService};
use crate::shutdown::ShutdownCoordinator;
use crate::telemetry::{init_telemetry, shutdown_telemetry};

pub struct ServeCommand {
    pub listen: Option<String>,
}

impl ServeCommand {
    pub fn new(listen: Option<String>) -> Self {
        Self { listen }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = config()?;
        init_telemetry(&config.observability)?;

        let store = open_store(config).await?;
        let service = Arc::new(TravelerService::new(store.clone(), ServiceSettings::from(config)));
        let app = api::router(service, config.server.body_limit_bytes);

        let listen = self.listen.as_deref().unwrap_or(&config.server.listen);
        let listener = tokio::net::TcpListener::bind(listen)
            .await
            .with_context(|| format!("failed to bind {listen}"))?;
        info!(address = %listen, backend = ?config.store.backend, "NEXUS listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(ShutdownCoordinator::wait_for_signal())
            .await
            .context("server error")?;

        ShutdownCoordinator::new(store, config.observability.metrics_enabled)
            .shutdown_all_services()
            .await?;
        shutdown_telemetry();
        Ok(())
    }
}
