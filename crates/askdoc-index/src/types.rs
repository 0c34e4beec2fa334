//! Data types for chunks, embedding records, and search results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inclusive page span a chunk was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Human-readable tag used in answer prompts, e.g. `page 3` or `pages 3-5`.
    pub fn label(&self) -> String {
        if self.start == self.end {
            format!("page {}", self.start)
        } else {
            format!("pages {}-{}", self.start, self.end)
        }
    }
}

/// Enrichment metadata value: string, number, bool, or null.
///
/// Unknown keys from the enrichment model are tolerated and kept; anything
/// that doesn't fit these shapes is dropped during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A bounded, overlapping segment of document text with stable identity and
/// page provenance. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: `<document_id>:<sequence_index>`.
    pub id: String,
    pub text: String,
    /// Position of this chunk in the document.
    pub sequence_index: usize,
    pub pages: PageRange,
    /// Advisory enrichment metadata; empty when enrichment failed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetaValue>,
}

impl Chunk {
    pub fn new(document_id: &str, sequence_index: usize, text: String, pages: PageRange) -> Self {
        Self {
            id: format!("{}:{}", document_id, sequence_index),
            text,
            sequence_index,
            pages,
            metadata: BTreeMap::new(),
        }
    }

    /// Text submitted to the embedding model.
    ///
    /// When metadata is present the known attributes are prefixed onto the
    /// content so retrieval can match on them too; otherwise the raw text.
    pub fn embedding_text(&self) -> String {
        if self.metadata.is_empty() {
            return self.text.clone();
        }
        let mut lines = Vec::new();
        for key in ["topic", "section", "clause", "entities"] {
            if let Some(value) = self.metadata.get(key).and_then(MetaValue::as_str) {
                if !value.is_empty() {
                    let mut label: Vec<char> = key.chars().collect();
                    label[0] = label[0].to_ascii_uppercase();
                    lines.push(format!("{}: {}", label.iter().collect::<String>(), value));
                }
            }
        }
        if lines.is_empty() {
            return self.text.clone();
        }
        lines.push(format!("Content: {}", self.text));
        lines.join("\n")
    }
}

/// One chunk's embedding, tagged with the model that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub model_identifier: String,
}

/// A scored search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub score: f32,
}

/// Similarity metric, fixed at build time and recorded in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity over row-normalized vectors.
    Cosine,
    /// Raw dot product.
    InnerProduct,
    /// Euclidean distance, reported as a negated score so higher is better.
    L2,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::InnerProduct => "inner_product",
            Self::L2 => "l2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cosine" => Some(Self::Cosine),
            "inner_product" => Some(Self::InnerProduct),
            "l2" => Some(Self::L2),
            _ => None,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-level facts recorded alongside the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Content hash of the source bytes.
    pub document_id: String,
    /// Original filename or URL.
    pub source_name: String,
    /// Page count of the source document.
    pub pages: u32,
    /// Ingestion time, epoch milliseconds.
    pub ingested_at: i64,
}

/// Index-level statistics for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_id: String,
    pub source_name: String,
    pub pages: u32,
    pub chunks: usize,
    pub model_identifier: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_label() {
        assert_eq!(PageRange::new(3, 3).label(), "page 3");
        assert_eq!(PageRange::new(3, 5).label(), "pages 3-5");
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = Chunk::new("abc123", 7, "text".into(), PageRange::new(1, 1));
        let b = Chunk::new("abc123", 7, "text".into(), PageRange::new(1, 1));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "abc123:7");
    }

    #[test]
    fn test_embedding_text_without_metadata_is_raw() {
        let chunk = Chunk::new("d", 0, "raw content".into(), PageRange::new(1, 1));
        assert_eq!(chunk.embedding_text(), "raw content");
    }

    #[test]
    fn test_embedding_text_prefixes_known_metadata() {
        let mut chunk = Chunk::new("d", 0, "the grace period is 30 days".into(), PageRange::new(2, 2));
        chunk
            .metadata
            .insert("topic".into(), MetaValue::String("premiums".into()));
        chunk
            .metadata
            .insert("section".into(), MetaValue::String("Terms".into()));
        chunk
            .metadata
            .insert("confidence".into(), MetaValue::Number(0.9));
        let text = chunk.embedding_text();
        assert!(text.starts_with("Topic: premiums\nSection: Terms"));
        assert!(text.ends_with("Content: the grace period is 30 days"));
    }

    #[test]
    fn test_metric_round_trips_through_names() {
        for metric in [
            DistanceMetric::Cosine,
            DistanceMetric::InnerProduct,
            DistanceMetric::L2,
        ] {
            assert_eq!(DistanceMetric::parse(metric.as_str()), Some(metric));
        }
        assert_eq!(DistanceMetric::parse("manhattan"), None);
    }
}
