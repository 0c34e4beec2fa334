//! Answer generation.
//!
//! The prompt-assembly contract lives here; the model call itself is an
//! external collaborator behind `LanguageModel`. Empty evidence short-circuits
//! to a fixed response without spending a model call.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use askdoc_core::{run_with_retry, Error, Result, RetryPolicy};
use askdoc_index::PageRange;
use askdoc_llm::{GenerateOptions, LanguageModel};
use askdoc_retrieve::RetrievalResult;

/// Response returned when retrieval produced no evidence.
pub const NO_INFORMATION_RESPONSE: &str =
    "No relevant information was found in the document to answer this question.";

/// A generated answer with the page provenance of its evidence.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Page ranges of the evidence, in rank order.
    pub evidence_pages: Vec<PageRange>,
}

/// Generates answers over retrieved evidence.
pub struct Answerer {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Answerer {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            model,
            retry,
            timeout,
        }
    }

    /// Answer `question` from the retrieved evidence.
    ///
    /// Transient model failures are retried; a model that stays down surfaces
    /// as an error rather than a fabricated answer.
    pub async fn answer(&self, question: &str, retrieval: &RetrievalResult) -> Result<Answer> {
        if retrieval.is_empty() {
            debug!("No evidence for {:?}; skipping model call", question);
            return Ok(Answer {
                text: NO_INFORMATION_RESPONSE.to_string(),
                evidence_pages: Vec::new(),
            });
        }

        let prompt = build_prompt(question, retrieval);
        let options = GenerateOptions {
            temperature: 0.2,
            max_tokens: 512,
        };
        let text = run_with_retry(&self.retry, "answer generation", || async {
            tokio::time::timeout(self.timeout, self.model.generate(&prompt, &options))
                .await
                .map_err(|_| Error::Transient("answer generation timed out".into()))?
        })
        .await?;

        Ok(Answer {
            text,
            evidence_pages: retrieval.evidence_pages(),
        })
    }
}

/// Assemble the answer prompt: the question plus every evidence chunk tagged
/// with its page range for traceability.
pub fn build_prompt(question: &str, retrieval: &RetrievalResult) -> String {
    let mut context = String::new();
    for (i, scored) in retrieval.evidence.iter().enumerate() {
        context.push_str(&format!(
            "Excerpt {} [{}] (relevance {:.3}):\n{}\n\n",
            i + 1,
            scored.chunk.pages.label(),
            scored.score,
            scored.chunk.text.trim()
        ));
    }

    format!(
        "You are a document intelligence assistant. Answer the question using \
         ONLY the evidence below.\n\n\
         Question: \"{}\"\n\n\
         Evidence:\n{}\
         INSTRUCTIONS:\n\
         - Answer in 1-2 sentences using exact numbers and facts from the evidence\n\
         - Do not mention excerpts, page numbers, or relevance scores\n\
         - Do not add explanations, notes, or extra commentary\n\
         - If the evidence does not answer the question, say so plainly\n\n\
         Answer:",
        question, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdoc_index::{Chunk, PageRange};
    use askdoc_llm::StaticModel;
    use askdoc_retrieve::ScoredChunk;
    use async_trait::async_trait;

    fn evidence() -> RetrievalResult {
        let chunk = Chunk::new(
            "doc1",
            0,
            "The grace period for premium payment is thirty days.".into(),
            PageRange::new(4, 5),
        );
        RetrievalResult {
            evidence: vec![ScoredChunk { chunk, score: 0.87 }],
            candidates: 1,
        }
    }

    fn answerer(model: Arc<dyn LanguageModel>) -> Answerer {
        Answerer::new(
            model,
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_empty_evidence_skips_the_model() {
        let model = Arc::new(StaticModel::new("should never appear"));
        let answer = answerer(model.clone())
            .answer("What is the grace period?", &RetrievalResult::default())
            .await
            .unwrap();
        assert_eq!(answer.text, NO_INFORMATION_RESPONSE);
        assert!(answer.evidence_pages.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_carries_evidence_pages() {
        let model = Arc::new(StaticModel::new("Thirty days."));
        let answer = answerer(model.clone())
            .answer("What is the grace period?", &evidence())
            .await
            .unwrap();
        assert_eq!(answer.text, "Thirty days.");
        assert_eq!(answer.evidence_pages, vec![PageRange::new(4, 5)]);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_prompt_tags_evidence_with_pages() {
        let prompt = build_prompt("What is the grace period?", &evidence());
        assert!(prompt.contains("Question: \"What is the grace period?\""));
        assert!(prompt.contains("[pages 4-5]"));
        assert!(prompt.contains("grace period for premium payment"));
    }

    struct DownModel;

    #[async_trait]
    impl LanguageModel for DownModel {
        fn model_identifier(&self) -> &str {
            "down"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> askdoc_core::Result<String> {
            Err(Error::Transient("service unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_persistent_failure_surfaces_as_error() {
        let result = answerer(Arc::new(DownModel))
            .answer("anything", &evidence())
            .await;
        assert!(matches!(result, Err(Error::Transient(_))));
    }
}
