//! Document ingestion routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use askdoc_core::Error;
use askdoc_ingest::{content_hash, extract_document};

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/documents", post(ingest_document))
}

#[derive(Deserialize)]
struct IngestRequest {
    /// Local file path or http(s) URL of a PDF.
    source: String,
}

async fn ingest_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> impl IntoResponse {
    match run_ingest(&state, &req.source).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => error_response(e),
    }
}

async fn run_ingest(
    state: &AppState,
    source: &str,
) -> askdoc_core::Result<serde_json::Value> {
    let (bytes, source_name) = fetch_source(state, source).await?;
    let document_id = content_hash(&bytes);

    // A persisted artifact for the same content means the work is already
    // done; load and publish it instead of reprocessing.
    if state.artifact_exists(&document_id) {
        let index = state.get_or_load_index(&document_id)?;
        return Ok(ingest_response(&index.stats(), index.info().ingested_at, "already_indexed"));
    }

    keep_upload(state, &document_id, &bytes).await;

    let document = extract_document(state.extractor.as_ref(), &bytes, &source_name).await?;
    let index = state
        .pipeline
        .run(&document, &state.shutdown.child_token())
        .await?;
    index.persist(&state.config.data_paths.index_file(&document_id))?;

    let stats = index.stats();
    let ingested_at = index.info().ingested_at;
    state.publish(Arc::new(index));
    info!(
        "Ingested {} ({}): {} chunks",
        document_id, source_name, stats.chunks
    );
    Ok(ingest_response(&stats, ingested_at, "indexed"))
}

fn ingest_response(
    stats: &askdoc_index::IndexStats,
    ingested_at: i64,
    status: &str,
) -> serde_json::Value {
    serde_json::json!({
        "document_id": stats.document_id,
        "source_name": stats.source_name,
        "pages": stats.pages,
        "chunks": stats.chunks,
        "status": status,
        "ingested_at": rfc3339(ingested_at),
    })
}

fn rfc3339(epoch_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

/// Resolve the request source to raw bytes plus a display name.
async fn fetch_source(state: &AppState, source: &str) -> askdoc_core::Result<(Vec<u8>, String)> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = state
            .http
            .get(source)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("failed to download {}: {}", source, e)))?;
        if !response.status().is_success() {
            return Err(Error::Extraction(format!(
                "download of {} returned {}",
                source,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Extraction(format!("failed to download {}: {}", source, e)))?;
        let name = source
            .split('/')
            .next_back()
            .filter(|s| !s.is_empty())
            .unwrap_or("download.pdf")
            .split('?')
            .next()
            .unwrap_or("download.pdf")
            .to_string();
        Ok((bytes.to_vec(), name))
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| Error::Extraction(format!("failed to read {}: {}", source, e)))?;
        let name = std::path::Path::new(source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(source)
            .to_string();
        Ok((bytes, name))
    }
}

/// Keep a copy of the source bytes under uploads/. Advisory only.
async fn keep_upload(state: &AppState, document_id: &str, bytes: &[u8]) {
    let path = state
        .config
        .data_paths
        .uploads
        .join(format!("{}.pdf", document_id));
    if let Err(e) = tokio::fs::write(&path, bytes).await {
        warn!("Could not keep upload copy at {}: {}", path.display(), e);
    }
}
