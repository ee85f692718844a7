// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::{DashboardService, RefreshTrigger};
use crate::application::poller::RefreshPoller;
use crate::application::preference_store::{MemoryStore, PreferenceStore};
use crate::application::transport::TransportResolver;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_transport::HttpTransport;
use crate::infrastructure::json_file_store::JsonFileStore;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create adapters (infrastructure layer)
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(
        config.source.request_timeout_secs,
    ))?);
    let store: Arc<dyn PreferenceStore> = if config.storage.preferences_path.is_empty() {
        Arc::new(MemoryStore::new())
    } else {
        let store = JsonFileStore::open(&config.storage.preferences_path);
        tracing::info!(path = %store.path().display(), "preferences file");
        Arc::new(store)
    };

    // Create services (application layer)
    let resolver = TransportResolver::new(transport, config.transport.strategies());
    let dashboard_service = DashboardService::new(
        resolver,
        store,
        config.source.default_url.clone(),
        config.alerts.warning_threshold,
    );

    // Initial load runs alongside the server so a slow source does not delay startup
    tokio::spawn({
        let service = dashboard_service.clone();
        async move {
            if let Err(e) = service.refresh(RefreshTrigger::Manual).await {
                tracing::warn!(error = %e, "initial load failed");
            }
        }
    });
    let poller = RefreshPoller::new(
        dashboard_service.clone(),
        Duration::from_secs(config.source.refresh_interval_secs.max(1)),
    )
    .start();

    // Build router (presentation layer)
    let router = build_router(Arc::new(AppState { dashboard_service }));

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "starting transformer-telemetry service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    poller.abort();
    Ok(())
}
