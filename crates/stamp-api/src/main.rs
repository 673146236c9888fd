//! # stamp-api: Binary Entry Point
//!
//! Loads configuration from the environment, connects the collaborators,
//! runs the bootstrap sequence and serves until Ctrl-C.

use anyhow::Context;
use stamp_anchor::Services;
use stamp_api::state::AppConfig;
use stamp_client::{StampClients, StampConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let stamp_config = StampConfig::from_env().context("loading collaborator configuration")?;
    let app_config = AppConfig::from_env().context("loading server configuration")?;
    tracing::info!(config = ?stamp_config, "configuration loaded");

    let clients = StampClients::connect(&stamp_config)
        .await
        .context("connecting collaborators")?;
    let port = app_config.port;
    let state = stamp_api::bootstrap::bootstrap(app_config, Services::from_clients(&clients))
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {e}");
            e
        })?;

    let app = stamp_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("stamp API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stamp API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
