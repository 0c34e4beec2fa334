//! In-memory vector index with metric-aware nearest-neighbor search.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use tracing::debug;

use askdoc_core::{Error, Result};

use crate::types::{
    Chunk, DistanceMetric, DocumentInfo, EmbeddingRecord, IndexStats, SearchHit,
};

/// Immutable similarity index over one document's chunks.
///
/// Owns the embedding records and the `chunk_id → Chunk` map. Built once
/// from a completed chunk set; a rebuild produces a new index that the
/// owning context swaps in whole.
pub struct VectorIndex {
    info: DocumentInfo,
    model_identifier: String,
    dimension: usize,
    metric: DistanceMetric,
    chunks: HashMap<String, Chunk>,
    /// Records in ascending sequence order; row `i` of `matrix` belongs to
    /// `records[i]`.
    records: Vec<EmbeddingRecord>,
    /// Row-per-record score matrix; rows are L2-normalized for cosine.
    matrix: Array2<f32>,
    /// `(chunk_id, sequence_index)` per row, for ranking and tie-breaks.
    rows: Vec<(String, usize)>,
}

impl VectorIndex {
    /// Build an index from chunks and their embeddings.
    ///
    /// Requires a 1:1 correspondence between chunks and records by chunk id,
    /// and that every record carries the declared model and dimension.
    /// Violations are configuration errors, not warnings.
    pub fn build(
        info: DocumentInfo,
        model_identifier: &str,
        dimension: usize,
        metric: DistanceMetric,
        chunks: Vec<Chunk>,
        records: Vec<EmbeddingRecord>,
    ) -> Result<Self> {
        if chunks.len() != records.len() {
            return Err(Error::Config(format!(
                "index build for {}: {} chunks but {} embeddings",
                info.document_id,
                chunks.len(),
                records.len()
            )));
        }
        if dimension == 0 {
            return Err(Error::Config("index dimension must be non-zero".into()));
        }

        let mut chunk_map: HashMap<String, Chunk> = HashMap::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk_map.insert(chunk.id.clone(), chunk).is_some() {
                return Err(Error::Config(format!(
                    "index build for {}: duplicate chunk id",
                    info.document_id
                )));
            }
        }

        let mut records = records;
        for record in &records {
            if record.model_identifier != model_identifier {
                return Err(Error::Config(format!(
                    "embedding for chunk {} was produced by {}, index declares {}",
                    record.chunk_id, record.model_identifier, model_identifier
                )));
            }
            if record.vector.len() != dimension {
                return Err(Error::Config(format!(
                    "embedding for chunk {} has dimension {}, index declares {}",
                    record.chunk_id,
                    record.vector.len(),
                    dimension
                )));
            }
            if !chunk_map.contains_key(&record.chunk_id) {
                return Err(Error::Config(format!(
                    "embedding references unknown chunk {}",
                    record.chunk_id
                )));
            }
        }

        records.sort_by_key(|r| chunk_map[&r.chunk_id].sequence_index);

        let mut matrix = Array2::zeros((records.len(), dimension));
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut row = matrix.row_mut(i);
            for (slot, &v) in row.iter_mut().zip(&record.vector) {
                *slot = v;
            }
            if metric == DistanceMetric::Cosine {
                let norm = row.dot(&row).sqrt();
                if norm > 1e-9 {
                    row /= norm;
                }
            }
            rows.push((
                record.chunk_id.clone(),
                chunk_map[&record.chunk_id].sequence_index,
            ));
        }

        debug!(
            "Built index for {}: {} chunks, dim={}, metric={}",
            info.document_id,
            rows.len(),
            dimension,
            metric
        );

        Ok(Self {
            info,
            model_identifier: model_identifier.to_string(),
            dimension,
            metric,
            chunks: chunk_map,
            records,
            matrix,
            rows,
        })
    }

    /// Nearest-neighbor search, ranked by metric score.
    ///
    /// Returns at most `top_k` hits; all of them if the index is smaller.
    /// An empty index answers every query with an empty result. Ties are
    /// broken by ascending sequence index.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if self.rows.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::Config(format!(
                "query vector has dimension {}, index for {} declares {}",
                query.len(),
                self.info.document_id,
                self.dimension
            )));
        }

        let q = Array1::from_iter(query.iter().copied());
        let scores: Vec<f32> = match self.metric {
            DistanceMetric::Cosine => {
                let norm = q.dot(&q).sqrt();
                if norm < 1e-9 {
                    return Ok(Vec::new());
                }
                let unit = &q / norm;
                self.matrix.dot(&unit).to_vec()
            }
            DistanceMetric::InnerProduct => self.matrix.dot(&q).to_vec(),
            DistanceMetric::L2 => self
                .matrix
                .rows()
                .into_iter()
                .map(|row| {
                    let diff = &row - &q;
                    -diff.dot(&diff).sqrt()
                })
                .collect(),
        };

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.rows[a].1.cmp(&self.rows[b].1))
        });
        ranked.truncate(top_k);

        Ok(ranked
            .into_iter()
            .map(|i| SearchHit {
                chunk_id: self.rows[i].0.clone(),
                score: scores[i],
            })
            .collect())
    }

    /// Look up a chunk by id.
    pub fn chunk(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn document_id(&self) -> &str {
        &self.info.document_id
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub(crate) fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            document_id: self.info.document_id.clone(),
            source_name: self.info.source_name.clone(),
            pages: self.info.pages,
            chunks: self.rows.len(),
            model_identifier: self.model_identifier.clone(),
            dimension: self.dimension,
            metric: self.metric,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageRange;

    fn test_info() -> DocumentInfo {
        DocumentInfo {
            document_id: "doc1".into(),
            source_name: "doc1.pdf".into(),
            pages: 2,
            ingested_at: 0,
        }
    }

    fn chunk(seq: usize, text: &str) -> Chunk {
        Chunk::new("doc1", seq, text.into(), PageRange::new(1, 1))
    }

    fn record(seq: usize, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            chunk_id: format!("doc1:{}", seq),
            vector,
            model_identifier: "test-model".into(),
        }
    }

    fn build_small(metric: DistanceMetric) -> VectorIndex {
        VectorIndex::build(
            test_info(),
            "test-model",
            2,
            metric,
            vec![chunk(0, "alpha"), chunk(1, "beta"), chunk(2, "gamma")],
            vec![
                record(0, vec![1.0, 0.0]),
                record(1, vec![0.0, 1.0]),
                record(2, vec![0.7, 0.7]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_length_mismatch() {
        let result = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![chunk(0, "a")],
            vec![],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_rejects_mixed_models() {
        let mut bad = record(0, vec![1.0, 0.0]);
        bad.model_identifier = "other-model".into();
        let result = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![chunk(0, "a")],
            vec![bad],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_rejects_wrong_dimension() {
        let result = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![chunk(0, "a")],
            vec![record(0, vec![1.0, 0.0, 0.0])],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_rejects_unknown_chunk_reference() {
        let result = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![chunk(0, "a")],
            vec![record(5, vec![1.0, 0.0])],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cosine_search_ranks_by_similarity() {
        let index = build_small(DistanceMetric::Cosine);
        let hits = index.search(&[1.0, 0.05], 3).unwrap();
        assert_eq!(hits[0].chunk_id, "doc1:0");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn test_search_caps_at_top_k_and_index_size() {
        let index = build_small(DistanceMetric::Cosine);
        assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 3);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_index_answers_empty() {
        let index = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![],
            vec![],
        )
        .unwrap();
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
        // Dimension is not even inspected for an empty index.
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_config_error() {
        let index = build_small(DistanceMetric::Cosine);
        let result = index.search(&[1.0, 0.0, 0.0], 5);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ties_break_by_sequence_index() {
        let index = VectorIndex::build(
            test_info(),
            "test-model",
            2,
            DistanceMetric::Cosine,
            vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")],
            vec![
                record(2, vec![0.0, 1.0]),
                record(1, vec![1.0, 0.0]),
                record(0, vec![1.0, 0.0]),
            ],
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        // Chunks 0 and 1 score identically; 0 must come first.
        assert_eq!(hits[0].chunk_id, "doc1:0");
        assert_eq!(hits[1].chunk_id, "doc1:1");
        assert_eq!(hits[2].chunk_id, "doc1:2");
    }

    #[test]
    fn test_l2_prefers_nearest() {
        let index = build_small(DistanceMetric::L2);
        let hits = index.search(&[0.0, 1.0], 3).unwrap();
        assert_eq!(hits[0].chunk_id, "doc1:1");
        assert!(hits[0].score <= 0.0);
    }

    #[test]
    fn test_inner_product_prefers_largest_dot() {
        let index = build_small(DistanceMetric::InnerProduct);
        let hits = index.search(&[1.0, 1.0], 3).unwrap();
        // 0.7 + 0.7 beats either unit vector.
        assert_eq!(hits[0].chunk_id, "doc1:2");
    }

    #[test]
    fn test_zero_query_under_cosine_is_empty() {
        let index = build_small(DistanceMetric::Cosine);
        assert!(index.search(&[0.0, 0.0], 3).unwrap().is_empty());
    }
}
