//! OpenAI-compatible chat completion client.
//!
//! Works against any `/chat/completions` endpoint that speaks the OpenAI
//! wire format, including the NVIDIA integrate API.

use std::time::Duration;

use askdoc_core::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::model::{GenerateOptions, LanguageModel};

/// Non-streaming chat completion client.
pub struct OpenAiCompatModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatModel {
    /// Build a client for `base_url` (e.g. `https://integrate.api.nvidia.com/v1`).
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(Error::Config("LLM model name is empty".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    fn model_identifier(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "stream": false,
        });

        debug!("Generating with {} via {}", self.model, self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Error::Transient(format!("LLM request to {} failed: {}", self.endpoint, e))
            } else {
                Error::Model(format!("LLM request to {} failed: {}", self.endpoint, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &self.model, &text));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("malformed LLM response: {}", e)))?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                Error::Model(format!(
                    "LLM response for {} is missing message content",
                    self.model
                ))
            })
    }
}

fn classify_status(status: StatusCode, model: &str, body: &str) -> Error {
    match status.as_u16() {
        429 | 408 | 500..=599 => Error::Transient(format!(
            "LLM API returned {} for {}: {}",
            status, model, body
        )),
        401 | 403 => Error::Model(format!("LLM API rejected credentials ({}): {}", status, body)),
        _ => Error::Model(format!(
            "LLM API returned {} for {}: {}",
            status, model, body
        )),
    }
}
