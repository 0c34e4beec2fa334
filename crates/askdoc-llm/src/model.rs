//! Language model capability trait.

use std::sync::atomic::{AtomicUsize, Ordering};

use askdoc_core::Result;
use async_trait::async_trait;

/// Generation parameters passed with every request.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub max_tokens: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Trait for external text-generation backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the underlying model.
    fn model_identifier(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;
}

/// Model that always returns a fixed response and counts invocations.
pub struct StaticModel {
    response: String,
    calls: AtomicUsize,
}

impl StaticModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for StaticModel {
    fn model_identifier(&self) -> &str {
        "static"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}
