//! askdoc — single-document PDF question-answering server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("ASKDOC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = askdoc_core::AppConfig::from_env(&data_dir)?;
    let port = config.port;

    let embedder = askdoc_embed::create_embedder(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build embedder: {}", e))?;
    let model: Arc<dyn askdoc_llm::LanguageModel> = Arc::new(
        askdoc_llm::OpenAiCompatModel::new(
            &config.llm_endpoint,
            &config.llm_model,
            config.llm_api_key(),
            Duration::from_secs(config.request_timeout_secs),
        )
        .map_err(|e| anyhow::anyhow!("Failed to build LLM client: {}", e))?,
    );
    let extractor = Arc::new(askdoc_ingest::PdfTextExtractor);

    let state = Arc::new(
        AppState::new(config, embedder, model, extractor)
            .map_err(|e| anyhow::anyhow!("Failed to build state: {}", e))?,
    );

    // Forward ctrl-c into the cancellation token so in-flight ingestion
    // stops cooperatively before the listener shuts down.
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let app = routes::build_router(state.clone());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("askdoc server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(state.shutdown.clone().cancelled_owned())
        .await?;

    Ok(())
}
