//! Flame & Crumb ordering daemon
//!
//! Serves the chat endpoint that drives the model through the tool protocol,
//! plus menu, order summary and health endpoints.

use anyhow::Result;
use crumbd::config::Config;
use crumbd::server::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("crumbd v{} starting", crumbd::VERSION);

    let config = Config::load();
    let state = AppState::from_config(&config)?;

    server::run(&config, state).await
}
