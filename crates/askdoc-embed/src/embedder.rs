//! Embedding capability trait.

use askdoc_core::Result;
use async_trait::async_trait;

/// Trait for embedding backends.
///
/// A backend declares a stable `model_identifier` and a fixed output
/// `dimension`; every vector it produces has exactly that length. Indexes
/// record both and refuse queries embedded by anything else.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, recorded in built indexes.
    fn model_identifier(&self) -> &str;

    /// Output vector length.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
