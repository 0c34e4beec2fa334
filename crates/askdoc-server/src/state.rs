//! Shared application state.
//!
//! The state owns the published index handles. Queries read an `Arc`
//! snapshot without holding the lock; ingestion builds a fresh index off to
//! the side and publishes it with a single write-lock swap, so concurrent
//! readers always see either the old index or the fully built new one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use askdoc_answer::Answerer;
use askdoc_core::{AppConfig, Result, RetryPolicy};
use askdoc_embed::Embedder;
use askdoc_index::{DistanceMetric, IndexStats, VectorIndex};
use askdoc_ingest::{
    ChunkerConfig, IngestPipeline, MetadataEnricher, PipelineConfig, TextExtractor,
};
use askdoc_llm::LanguageModel;
use askdoc_retrieve::Retriever;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: AppConfig,
    pub extractor: Arc<dyn TextExtractor>,
    pub pipeline: IngestPipeline,
    pub retriever: Retriever,
    pub answerer: Answerer,
    pub http: reqwest::Client,
    /// Cancelled on shutdown; in-flight ingestion runs observe it.
    pub shutdown: CancellationToken,
    indexes: RwLock<HashMap<String, Arc<VectorIndex>>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let retry = RetryPolicy::default();
        let call_timeout = Duration::from_secs(config.request_timeout_secs);

        let enricher = MetadataEnricher::new(model.clone(), retry.clone(), call_timeout);
        let pipeline = IngestPipeline::new(
            embedder.clone(),
            enricher,
            PipelineConfig {
                chunker: ChunkerConfig {
                    chunk_size: config.chunk_size,
                    overlap: config.chunk_overlap,
                },
                metric: DistanceMetric::Cosine,
                worker_limit: config.worker_limit,
                embed_batch_size: config.embed_batch_size,
                call_timeout,
                retry: retry.clone(),
            },
        )?;

        let retriever =
            Retriever::new(embedder).with_expected_metric(DistanceMetric::Cosine);
        let answerer = Answerer::new(model, retry, call_timeout);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| askdoc_core::Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            extractor,
            pipeline,
            retriever,
            answerer,
            http,
            shutdown: CancellationToken::new(),
            indexes: RwLock::new(HashMap::new()),
        })
    }

    /// Published index for a document, loading the persisted artifact on
    /// first use.
    pub fn get_or_load_index(&self, document_id: &str) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.indexes.read().get(document_id) {
            return Ok(index.clone());
        }
        let path = self.config.data_paths.index_file(document_id);
        let index = Arc::new(VectorIndex::load(&path)?);
        self.publish(index.clone());
        Ok(index)
    }

    /// Atomically publish (or replace) an index.
    pub fn publish(&self, index: Arc<VectorIndex>) {
        self.indexes
            .write()
            .insert(index.document_id().to_string(), index);
    }

    /// Whether a persisted artifact already exists for this document.
    pub fn artifact_exists(&self, document_id: &str) -> bool {
        self.config.data_paths.index_file(document_id).exists()
    }

    /// Stats for every published index.
    pub fn published_stats(&self) -> Vec<IndexStats> {
        let mut stats: Vec<IndexStats> =
            self.indexes.read().values().map(|i| i.stats()).collect();
        stats.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        stats
    }
}
