//! API routes for crumbd

use crate::error::TurnError;
use crate::orchestrator::HistoryMessage;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use crumb_shared::catalog::{AddOn, MenuItem, Store};
use crumb_shared::order::{OrderRecord, OrderSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Chat Routes
// ============================================================================

/// `POST /api/chat` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub messages: Vec<HistoryMessage>,
    #[serde(default)]
    pub order_state: OrderRecord,
}

/// `POST /api/chat` success body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub message: String,
    pub order_state: OrderRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_item_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_store_map: Option<bool>,
}

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/api/chat", post(chat))
}

async fn chat(
    State(state): State<AppStateArc>,
    body: Bytes,
) -> Result<Json<ChatResponseBody>, TurnError> {
    let orchestrator = state.orchestrator.as_ref().ok_or_else(|| {
        let reason = state
            .config_error
            .clone()
            .unwrap_or_else(|| "Model client is not configured".to_string());
        warn!("Rejecting chat request: {}", reason);
        TurnError::Config(reason)
    })?;

    let request: ChatRequestBody = serde_json::from_slice(&body).map_err(|e| {
        warn!("Malformed chat body: {}", e);
        TurnError::MalformedRequest("Invalid JSON body".to_string())
    })?;

    info!(
        "Chat turn: {} messages, {} cart lines",
        request.messages.len(),
        request.order_state.cart.len()
    );

    let outcome = orchestrator
        .run_turn(&request.messages, request.order_state)
        .await?;

    let display_item_ids = (!outcome.intents.item_ids.is_empty()).then_some(outcome.intents.item_ids);
    let show_store_map = outcome.intents.show_store_map.then_some(true);

    Ok(Json(ChatResponseBody {
        message: outcome.message,
        order_state: outcome.order,
        display_item_ids,
        show_store_map,
    }))
}

// ============================================================================
// Menu Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MenuResponse {
    pub stores: Vec<Store>,
    pub items: Vec<MenuItem>,
    pub addons: Vec<AddOn>,
}

pub fn menu_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/menu", get(menu))
}

async fn menu(State(state): State<AppStateArc>) -> Json<MenuResponse> {
    let catalog = &state.catalog;
    Json(MenuResponse {
        stores: catalog.stores.clone(),
        items: catalog.items.clone(),
        addons: catalog.addons.clone(),
    })
}

// ============================================================================
// Order Routes
// ============================================================================

pub fn order_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/order/summary", post(order_summary))
}

async fn order_summary(body: Bytes) -> Result<Json<OrderSummary>, (StatusCode, Json<serde_json::Value>)> {
    let record: OrderRecord = serde_json::from_slice(&body).map_err(|e| {
        warn!("Malformed order record: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid order record" })),
        )
    })?;
    Ok(Json(record.summary()))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// False when the model provider key is missing
    pub model_configured: bool,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let model_configured = state.orchestrator.is_some();
    Json(HealthResponse {
        status: if model_configured { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model_configured,
    })
}
