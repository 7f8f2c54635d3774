use std::sync::Arc;

use recon_resolver::IdentityResolver;
use recon_store::{ContactRepository, InMemoryContactStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Contact reconciliation server.
pub struct ReconServer {
    config: ServerConfig,
    resolver: IdentityResolver,
}

impl ReconServer {
    pub fn new(config: ServerConfig, repository: Arc<dyn ContactRepository>) -> Self {
        let resolver = IdentityResolver::new(repository, config.resolver.clone());
        Self { config, resolver }
    }

    /// A server backed by a fresh in-memory store.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(InMemoryContactStore::new()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.resolver.clone())
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("recon server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
