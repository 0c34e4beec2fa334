//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all askdoc data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Persisted index artifacts (`data/indexes/`), one file per document.
    pub indexes: PathBuf,
    /// Downloaded / uploaded source documents (`data/uploads/`).
    pub uploads: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            indexes: root.join("indexes"),
            uploads: root.join("uploads"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Artifact path for a document id.
    pub fn index_file(&self, document_id: &str) -> PathBuf {
        self.indexes.join(format!("{}.db", document_id))
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.indexes)?;
        std::fs::create_dir_all(&self.uploads)?;
        Ok(())
    }
}

/// Top-level askdoc configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Concurrent external calls during ingestion.
    pub worker_limit: usize,
    /// Per-call timeout for external model requests, in seconds.
    pub request_timeout_secs: u64,
    /// Default number of candidates fetched per query.
    pub top_k: usize,
    /// Default evidence budget in characters.
    pub max_context_chars: usize,
    /// OpenAI-compatible base URL for the embedding API.
    pub embed_endpoint: String,
    /// Embedding model identifier; must match between build and query time.
    pub embed_model: String,
    /// Declared embedding dimension for the model above.
    pub embed_dimension: usize,
    /// Texts per embedding request.
    pub embed_batch_size: usize,
    /// OpenAI-compatible base URL for the answer/enrichment LLM.
    pub llm_endpoint: String,
    /// Chat model identifier.
    pub llm_model: String,
}

impl AppConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3003);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            chunk_size: env_parse("ASKDOC_CHUNK_SIZE", 1500),
            chunk_overlap: env_parse("ASKDOC_CHUNK_OVERLAP", 200),
            worker_limit: env_parse("ASKDOC_WORKER_LIMIT", 5),
            request_timeout_secs: env_parse("ASKDOC_REQUEST_TIMEOUT_SECS", 30),
            top_k: env_parse("ASKDOC_TOP_K", 10),
            max_context_chars: env_parse("ASKDOC_MAX_CONTEXT_CHARS", 8000),
            embed_endpoint: env_string(
                "ASKDOC_EMBED_ENDPOINT",
                "https://integrate.api.nvidia.com/v1",
            ),
            embed_model: env_string("ASKDOC_EMBED_MODEL", "nvidia/nv-embed-v1"),
            embed_dimension: env_parse("ASKDOC_EMBED_DIMENSION", 4096),
            embed_batch_size: env_parse("ASKDOC_EMBED_BATCH_SIZE", 16),
            llm_endpoint: env_string(
                "ASKDOC_LLM_ENDPOINT",
                "https://integrate.api.nvidia.com/v1",
            ),
            llm_model: env_string("ASKDOC_LLM_MODEL", "meta/llama-3.1-70b-instruct"),
        })
    }

    /// API key for the embedding endpoint. `NVIDIA_API_KEY` is the shared
    /// fallback since both defaults point at the same provider.
    pub fn embed_api_key(&self) -> Option<String> {
        std::env::var("ASKDOC_EMBED_API_KEY")
            .or_else(|_| std::env::var("NVIDIA_API_KEY"))
            .ok()
    }

    /// API key for the LLM endpoint.
    pub fn llm_api_key(&self) -> Option<String> {
        std::env::var("ASKDOC_LLM_API_KEY")
            .or_else(|_| std::env::var("NVIDIA_API_KEY"))
            .ok()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
