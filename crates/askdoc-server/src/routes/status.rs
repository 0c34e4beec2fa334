//! Service status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.published_stats();
    let total_documents = stats.len();
    let total_chunks: usize = stats.iter().map(|s| s.chunks).sum();
    Json(serde_json::json!({
        "status": "healthy",
        "service": "askdoc",
        "embedding_model": state.config.embed_model,
        "llm_model": state.config.llm_model,
        "documents": stats,
        "total_documents": total_documents,
        "total_chunks": total_chunks,
    }))
}
