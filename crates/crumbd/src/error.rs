//! Turn errors and their HTTP mapping.

use crate::llm_client::LlmError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crumb_shared::OrderRecord;
use serde_json::json;

/// Why a chat turn produced no reply
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Service is not set up to call the model
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    MalformedRequest(String),

    /// Model call failed; carries the last known record
    #[error("Model request failed: {source}")]
    Upstream {
        #[source]
        source: LlmError,
        order: Box<OrderRecord>,
    },
}

impl TurnError {
    pub fn upstream(source: LlmError, order: OrderRecord) -> Self {
        Self::Upstream {
            source,
            order: Box::new(order),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Record to echo back with the error, if any
    pub fn order(&self) -> Option<&OrderRecord> {
        match self {
            Self::Upstream { order, .. } => Some(order.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for TurnError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.to_string() });
        if let Some(order) = self.order() {
            body["orderState"] = json!(order);
        }
        (self.status_code(), Json(body)).into_response()
    }
}
