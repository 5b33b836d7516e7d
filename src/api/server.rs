use anyhow::{Context, Result};
use tokio::net::TcpListener;

use crate::application::UtrService;
use crate::config::ServerSettings;

use super::router::build_router;

/// HTTP front end of the UTR service.
pub struct UtrServer {
    settings: ServerSettings,
    service: UtrService,
}

impl UtrServer {
    pub fn new(settings: ServerSettings, service: UtrService) -> Self {
        Self { settings, service }
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.service.clone(), &self.settings.api_prefix)
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.settings.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.settings.bind_addr))?;

        tracing::info!(
            addr = %self.settings.bind_addr,
            prefix = %self.settings.api_prefix,
            "UTR server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
