//! HTTP request handlers.

pub mod contacts;
pub mod flows;
pub mod projects;
pub mod webhooks;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// Route-level error with an HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Upstream(u16, String),
    Timeout(String),
    Internal(String),
}

impl From<docflow_core::Error> for ApiError {
    fn from(err: docflow_core::Error) -> Self {
        use docflow_core::Error;
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::FlowNotFound(id) => ApiError::NotFound(format!("Flow {} not found", id)),
            Error::Signature(msg) => ApiError::Unauthorized(msg),
            Error::Upstream { status, body } => ApiError::Upstream(status, body),
            Error::ReconciliationTimeout(msg) => ApiError::Timeout(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(upstream_status, body) => (
                StatusCode::BAD_GATEWAY,
                format!("upstream returned {}: {}", upstream_status, body),
            ),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
