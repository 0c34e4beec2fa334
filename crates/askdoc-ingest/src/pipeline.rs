//! Document ingestion pipeline: chunk → enrich → embed → build index.
//!
//! Enrichment runs concurrently across chunks under a worker limit and is
//! advisory; embedding is batched, retried, and required. The pipeline never
//! touches a published index — it returns a freshly built one and leaves
//! publishing to the owning context.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use askdoc_core::{run_with_retry, Error, Result, RetryPolicy};
use askdoc_embed::Embedder;
use askdoc_index::{Chunk, DistanceMetric, DocumentInfo, EmbeddingRecord, MetaValue, VectorIndex};

use crate::chunker::{Chunker, ChunkerConfig};
use crate::enrich::MetadataEnricher;
use crate::extract::Document;

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunker: ChunkerConfig,
    pub metric: DistanceMetric,
    /// Concurrent enrichment calls.
    pub worker_limit: usize,
    /// Texts per embedding request.
    pub embed_batch_size: usize,
    /// Timeout applied independently to every external call.
    pub call_timeout: std::time::Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            metric: DistanceMetric::Cosine,
            worker_limit: 5,
            embed_batch_size: 16,
            call_timeout: std::time::Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Turns an extracted document into a built vector index.
pub struct IngestPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    enricher: MetadataEnricher,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        enricher: MetadataEnricher,
        config: PipelineConfig,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunker.clone())?;
        Ok(Self {
            chunker,
            embedder,
            enricher,
            config,
        })
    }

    /// Run the full pipeline for one document.
    ///
    /// `cancel` is checked between units of work; a cancelled run is
    /// abandoned with `Error::Cancelled` before any index is produced.
    pub async fn run(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<VectorIndex> {
        self.ensure_live(document, cancel)?;

        let mut chunks = self.chunker.chunk(document);
        info!(
            "Chunked {} ({} pages) into {} chunks",
            document.id,
            document.pages.len(),
            chunks.len()
        );

        if !chunks.is_empty() {
            self.ensure_live(document, cancel)?;

            // Enrichment fan-out. Results carry the sequence index so order
            // can be restored after buffer_unordered scrambles completion.
            let futures: Vec<_> = chunks
                .iter()
                .map(|chunk| self.enrich_one(chunk, cancel.clone()))
                .collect();
            let enriched: Vec<(usize, BTreeMap<String, MetaValue>)> = stream::iter(futures)
                .buffer_unordered(self.config.worker_limit.max(1))
                .collect()
                .await;
            self.ensure_live(document, cancel)?;

            let mut applied = 0usize;
            for (sequence_index, metadata) in enriched {
                if metadata.is_empty() {
                    continue;
                }
                if let Some(chunk) = chunks.get_mut(sequence_index) {
                    chunk.metadata = metadata;
                    applied += 1;
                }
            }
            debug!("Enriched {}/{} chunks", applied, chunks.len());
        }

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.config.embed_batch_size.max(1)) {
            self.ensure_live(document, cancel)?;

            let texts: Vec<String> = batch.iter().map(|c| c.embedding_text()).collect();
            let vectors = run_with_retry(&self.config.retry, "embed batch", || async {
                tokio::time::timeout(self.config.call_timeout, self.embedder.embed_batch(&texts))
                    .await
                    .map_err(|_| Error::Transient("embedding request timed out".into()))?
            })
            .await?;

            if vectors.len() != batch.len() {
                return Err(Error::Model(format!(
                    "embedder returned {} vectors for a batch of {}",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                records.push(EmbeddingRecord {
                    chunk_id: chunk.id.clone(),
                    vector,
                    model_identifier: self.embedder.model_identifier().to_string(),
                });
            }
        }

        let info = DocumentInfo {
            document_id: document.id.clone(),
            source_name: document.source_name.clone(),
            pages: document.pages.len() as u32,
            ingested_at: now_millis(),
        };
        VectorIndex::build(
            info,
            self.embedder.model_identifier(),
            self.embedder.dimension(),
            self.config.metric,
            chunks,
            records,
        )
    }

    /// Enrich a single chunk, honoring cancellation. Returns the chunk's
    /// sequence index alongside its (possibly empty) advisory metadata.
    async fn enrich_one(
        &self,
        chunk: &Chunk,
        token: CancellationToken,
    ) -> (usize, BTreeMap<String, MetaValue>) {
        if token.is_cancelled() {
            return (chunk.sequence_index, BTreeMap::new());
        }
        (chunk.sequence_index, self.enricher.enrich(chunk).await)
    }

    fn ensure_live(&self, document: &Document, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            Err(Error::Cancelled(format!("ingestion of {}", document.id)))
        } else {
            Ok(())
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Page;
    use askdoc_embed::HashEmbedder;
    use askdoc_llm::StaticModel;
    use std::time::Duration;

    fn test_document() -> Document {
        Document {
            id: "doc1".into(),
            source_name: "policy.pdf".into(),
            pages: vec![
                Page {
                    number: 1,
                    text: "The grace period for premium payment is thirty days from the due date. "
                        .repeat(4),
                },
                Page {
                    number: 2,
                    text: "Organ donor expenses are covered when the insured undergoes transplantation surgery. "
                        .repeat(4),
                },
            ],
        }
    }

    fn pipeline(model: StaticModel) -> IngestPipeline {
        let enricher = MetadataEnricher::new(
            Arc::new(model),
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            },
            Duration::from_secs(5),
        );
        IngestPipeline::new(
            Arc::new(HashEmbedder::new(128)),
            enricher,
            PipelineConfig {
                chunker: ChunkerConfig {
                    chunk_size: 120,
                    overlap: 20,
                },
                embed_batch_size: 4,
                ..PipelineConfig::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_builds_a_queryable_index() {
        let model = StaticModel::new(r#"{"topic": "insurance", "entities": "grace period"}"#);
        let index = pipeline(model)
            .run(&test_document(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(index.len() > 1);
        assert_eq!(index.document_id(), "doc1");
        assert_eq!(index.model_identifier(), "askdoc/hash-v1");
        assert_eq!(index.dimension(), 128);

        // Every chunk got the advisory metadata.
        let chunk = index.chunk("doc1:0").unwrap();
        assert_eq!(
            chunk.metadata.get("topic").and_then(|v| v.as_str()),
            Some("insurance")
        );
    }

    #[tokio::test]
    async fn test_run_survives_enrichment_garbage() {
        let model = StaticModel::new("no json here");
        let index = pipeline(model)
            .run(&test_document(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(index.len() > 1);
        assert!(index.chunk("doc1:0").unwrap().metadata.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_abandons_the_run() {
        let model = StaticModel::new("{}");
        let token = CancellationToken::new();
        token.cancel();
        let result = pipeline(model).run(&test_document(), &token).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_empty_document_builds_empty_index() {
        let model = StaticModel::new("{}");
        let empty = Document {
            id: "empty".into(),
            source_name: "empty.pdf".into(),
            pages: vec![],
        };
        let index = pipeline(model)
            .run(&empty, &CancellationToken::new())
            .await
            .unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_no_model_calls_for_empty_document() {
        let model = Arc::new(StaticModel::new("{}"));
        let enricher = MetadataEnricher::new(
            model.clone(),
            RetryPolicy::default(),
            Duration::from_secs(5),
        );
        let pipeline = IngestPipeline::new(
            Arc::new(HashEmbedder::new(16)),
            enricher,
            PipelineConfig::default(),
        )
        .unwrap();
        let empty = Document {
            id: "empty".into(),
            source_name: "empty.pdf".into(),
            pages: vec![],
        };
        pipeline.run(&empty, &CancellationToken::new()).await.unwrap();
        assert_eq!(model.calls(), 0);
    }
}
