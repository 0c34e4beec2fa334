//! LLM-backed chunk metadata enrichment.
//!
//! Enrichment is advisory: it runs once per chunk, independently and in
//! parallel, and any failure — timeout, transport error, unparseable model
//! output — degrades to an empty metadata map with a warning. It never
//! fails an ingestion run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use askdoc_core::{run_with_retry, Error, Result, RetryPolicy};
use askdoc_index::{Chunk, MetaValue};
use askdoc_llm::{extract_json, GenerateOptions, LanguageModel};

const ENRICH_PROMPT: &str = "\
You are a document intelligence engine. Extract structured metadata from the \
text below.

Return ONLY valid JSON in this format:
{
  \"topic\": \"primary topic of the text\",
  \"section\": \"section name or type, if identifiable\",
  \"clause\": \"clause or article number, if present\",
  \"entities\": \"comma-separated key terms, amounts, and dates\"
}

Pay special attention to specific numbers, dates, amounts, definitions, and
conditions mentioned in the text.

Text to analyze:
";

/// Per-chunk metadata enricher.
pub struct MetadataEnricher {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl MetadataEnricher {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            model,
            retry,
            timeout,
        }
    }

    /// Best-effort enrichment. Never mutates the chunk; returns the metadata
    /// to attach, empty on any failure.
    pub async fn enrich(&self, chunk: &Chunk) -> BTreeMap<String, MetaValue> {
        match self.try_enrich(chunk).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Enrichment for chunk {} failed: {}", chunk.id, e);
                BTreeMap::new()
            }
        }
    }

    async fn try_enrich(&self, chunk: &Chunk) -> Result<BTreeMap<String, MetaValue>> {
        let prompt = format!("{}{}", ENRICH_PROMPT, chunk.text.trim());
        let options = GenerateOptions {
            temperature: 0.0,
            max_tokens: 512,
        };
        let op = format!("enrich {}", chunk.id);
        let response = run_with_retry(&self.retry, &op, || async {
            tokio::time::timeout(self.timeout, self.model.generate(&prompt, &options))
                .await
                .map_err(|_| Error::Transient(format!("{} timed out", op)))?
        })
        .await?;

        let value = extract_json(&response)?;
        Ok(validate_metadata(&value))
    }
}

/// Coerce model output onto the metadata schema.
///
/// Scalars map to the matching variant; arrays of scalars are joined into a
/// comma-separated string (models like returning `entities` as a list);
/// nested objects are dropped. Unknown keys are tolerated and kept.
pub fn validate_metadata(value: &serde_json::Value) -> BTreeMap<String, MetaValue> {
    let mut out = BTreeMap::new();
    let Some(map) = value.as_object() else {
        return out;
    };
    for (key, v) in map {
        if let Some(converted) = convert_value(v) {
            out.insert(key.clone(), converted);
        }
    }
    out
}

fn convert_value(value: &serde_json::Value) -> Option<MetaValue> {
    match value {
        serde_json::Value::String(s) => Some(MetaValue::String(s.clone())),
        serde_json::Value::Number(n) => n.as_f64().map(MetaValue::Number),
        serde_json::Value::Bool(b) => Some(MetaValue::Bool(*b)),
        serde_json::Value::Null => Some(MetaValue::Null),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.clone()),
                    serde_json::Value::Number(n) => Some(n.to_string()),
                    serde_json::Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(MetaValue::String(parts.join(", ")))
            }
        }
        serde_json::Value::Object(_) => None,
    }
}
