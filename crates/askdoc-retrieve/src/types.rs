//! Retrieval result types.

use serde::Serialize;

use askdoc_index::{Chunk, PageRange};

/// One evidence chunk with its relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ordered evidence for a query.
///
/// At most `top_k` entries, scores non-increasing, ties already resolved by
/// the index's sequence-order rule. Empty is a valid outcome (empty index or
/// no candidates), distinct from the budget-exceeded error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub evidence: Vec<ScoredChunk>,
    /// How many candidates the search produced before budget assembly.
    pub candidates: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }

    pub fn len(&self) -> usize {
        self.evidence.len()
    }

    /// Total characters of included evidence text.
    pub fn context_chars(&self) -> usize {
        self.evidence
            .iter()
            .map(|e| e.chunk.text.chars().count())
            .sum()
    }

    /// Page ranges of the evidence, in rank order.
    pub fn evidence_pages(&self) -> Vec<PageRange> {
        self.evidence.iter().map(|e| e.chunk.pages).collect()
    }
}
