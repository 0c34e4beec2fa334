//! Question-answer route.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;

use askdoc_core::Error;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ask", post(ask))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    document_id: String,
    top_k: Option<usize>,
    max_context_chars: Option<usize>,
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    match run_ask(&state, &req).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => error_response(e),
    }
}

async fn run_ask(state: &AppState, req: &AskRequest) -> askdoc_core::Result<serde_json::Value> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(Error::Config("question must not be empty".into()));
    }

    let index = state.get_or_load_index(&req.document_id)?;
    let top_k = req.top_k.unwrap_or(state.config.top_k);
    let budget = req.max_context_chars.unwrap_or(state.config.max_context_chars);

    let retrieval = state.retriever.retrieve(&index, question, top_k, budget).await?;
    debug!(
        "Question against {} used {}/{} candidates ({} chars)",
        req.document_id,
        retrieval.len(),
        retrieval.candidates,
        retrieval.context_chars()
    );

    let answer = state.answerer.answer(question, &retrieval).await?;
    Ok(serde_json::json!({
        "answer": answer.text,
        "evidence_pages": answer.evidence_pages,
        "document_id": req.document_id,
    }))
}
