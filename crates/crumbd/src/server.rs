//! HTTP server for crumbd

use crate::config::Config;
use crate::llm_client::{HttpLlmClient, LlmClient};
use crate::orchestrator::Orchestrator;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use crumb_shared::Catalog;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub catalog: Arc<Catalog>,
    /// Absent when the model client could not be configured
    pub orchestrator: Option<Orchestrator>,
    /// Why `orchestrator` is absent, shown to chat callers
    pub config_error: Option<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            catalog: Arc::clone(orchestrator.catalog()),
            orchestrator: Some(orchestrator),
            config_error: None,
            start_time: Instant::now(),
        }
    }

    /// State that serves the catalog but refuses chat turns
    pub fn unconfigured(catalog: Arc<Catalog>, reason: impl Into<String>) -> Self {
        Self {
            catalog,
            orchestrator: None,
            config_error: Some(reason.into()),
            start_time: Instant::now(),
        }
    }

    /// Build the state from configuration and the process environment.
    /// A missing API key is not fatal here; chat requests report it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = Arc::new(Catalog::standard());

        let api_key = match config.llm.api_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("{}", e);
                return Ok(Self::unconfigured(catalog, e.to_string()));
            }
        };

        let client: Arc<dyn LlmClient> = Arc::new(
            HttpLlmClient::new(&config.llm.endpoint, api_key, config.llm.timeout_secs)
                .context("building model client")?,
        );
        info!("  Model: {} via {}", config.llm.model, config.llm.endpoint);

        Ok(Self::new(Orchestrator::new(
            client,
            catalog,
            config.llm.model.clone(),
            config.llm.max_tokens,
        )))
    }
}

/// All routes with middleware applied
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(routes::chat_routes())
        .merge(routes::menu_routes())
        .merge(routes::order_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(config: &Config, state: AppState) -> Result<()> {
    let app = router(state, config.server.max_body_bytes);

    let addr = config.server.bind.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully");
}
