//! HTTP route handlers.

pub mod ask;
pub mod documents;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use askdoc_core::Error;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(documents::routes())
        .merge(ask::routes())
}

/// Map the error taxonomy onto HTTP. Budget overruns get their own status
/// and code so callers can tell them apart from "no results".
pub(crate) fn error_response(error: Error) -> (StatusCode, Json<serde_json::Value>) {
    let (status, code) = match &error {
        Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        Error::Extraction(_) => (StatusCode::BAD_REQUEST, "extraction_failed"),
        Error::EvidenceBudgetExceeded(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "evidence_too_large")
        }
        Error::Transient(_) | Error::Model(_) => (StatusCode::BAD_GATEWAY, "upstream_failed"),
        Error::Cancelled(_) => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
        Error::CorruptIndex(_) => (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_index"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "detail": error.to_string(),
        })),
    )
}
