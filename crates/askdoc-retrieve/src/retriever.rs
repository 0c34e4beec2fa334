//! Query-time retriever.

use std::sync::Arc;

use tracing::debug;

use askdoc_core::{Error, Result};
use askdoc_embed::{Embedder, QueryCache};
use askdoc_index::{DistanceMetric, VectorIndex};

use crate::types::{RetrievalResult, ScoredChunk};

/// Retrieves budgeted evidence from a vector index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    cache: QueryCache,
    expected_metric: Option<DistanceMetric>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            cache: QueryCache::default_cache(),
            expected_metric: None,
        }
    }

    /// Require indexes to declare this metric; a mismatch on retrieve is a
    /// configuration error rather than silently reinterpreted scores.
    pub fn with_expected_metric(mut self, metric: DistanceMetric) -> Self {
        self.expected_metric = Some(metric);
        self
    }

    /// Retrieve evidence for `query`.
    ///
    /// Consistency checks run before anything else: the query must be
    /// embedded by the same model, at the same dimension, that built the
    /// index. Evidence is then assembled greedily in rank order — whole
    /// chunks only — while the cumulative character count stays within
    /// `max_context_chars`.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        query: &str,
        top_k: usize,
        max_context_chars: usize,
    ) -> Result<RetrievalResult> {
        if self.embedder.model_identifier() != index.model_identifier() {
            return Err(Error::Config(format!(
                "query embedder is {} but index for {} was built with {}",
                self.embedder.model_identifier(),
                index.document_id(),
                index.model_identifier()
            )));
        }
        if self.embedder.dimension() != index.dimension() {
            return Err(Error::Config(format!(
                "query embedder dimension {} does not match index dimension {}",
                self.embedder.dimension(),
                index.dimension()
            )));
        }
        if let Some(expected) = self.expected_metric {
            if index.metric() != expected {
                return Err(Error::Config(format!(
                    "index for {} uses metric {}, expected {}",
                    index.document_id(),
                    index.metric(),
                    expected
                )));
            }
        }

        if index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let vector = match self.cache.get(query) {
            Some(cached) => cached,
            None => {
                let vector = self.embedder.embed(query).await?;
                self.cache.put(query.to_string(), vector.clone());
                vector
            }
        };

        let hits = index.search(&vector, top_k)?;
        debug!(
            "Query against {} produced {} candidates",
            index.document_id(),
            hits.len()
        );

        let mut evidence = Vec::new();
        let mut used_chars = 0usize;
        for hit in &hits {
            let chunk = index.chunk(&hit.chunk_id).ok_or_else(|| {
                Error::Internal(format!("search returned unknown chunk {}", hit.chunk_id))
            })?;
            let chars = chunk.text.chars().count();
            if used_chars + chars > max_context_chars {
                break;
            }
            used_chars += chars;
            evidence.push(ScoredChunk {
                chunk: chunk.clone(),
                score: hit.score,
            });
        }

        if evidence.is_empty() && !hits.is_empty() {
            return Err(Error::EvidenceBudgetExceeded(format!(
                "best candidate for {:?} alone exceeds the {}-char context budget",
                query, max_context_chars
            )));
        }

        Ok(RetrievalResult {
            evidence,
            candidates: hits.len(),
        })
    }
}
