//! Askdoc Embed — the embedding capability consumed at index-build and
//! query time.
//!
//! The `Embedder` trait is the seam the rest of the system sees. The same
//! backend (same `model_identifier`, same `dimension`) must serve both index
//! construction and queries; the index and retriever enforce this.

pub mod cache;
pub mod embedder;
pub mod hash;
pub mod remote;

pub use cache::QueryCache;
pub use embedder::Embedder;
pub use hash::HashEmbedder;
pub use remote::RemoteEmbedder;

use std::sync::Arc;
use std::time::Duration;

use askdoc_core::AppConfig;

/// Create the embedder described by the configuration.
///
/// With an API key present this is the remote backend; without one the
/// deterministic hash backend keeps the pipeline usable offline.
pub fn create_embedder(config: &AppConfig) -> askdoc_core::Result<Arc<dyn Embedder>> {
    match config.embed_api_key() {
        Some(key) => {
            let embedder = RemoteEmbedder::new(
                &config.embed_endpoint,
                &config.embed_model,
                Some(key),
                config.embed_dimension,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            tracing::info!(
                "Using remote embedder {} (dim={})",
                config.embed_model,
                config.embed_dimension
            );
            Ok(Arc::new(embedder))
        }
        None => {
            tracing::warn!("No embedding API key configured; using offline hash embedder");
            Ok(Arc::new(HashEmbedder::new(config.embed_dimension)))
        }
    }
}
