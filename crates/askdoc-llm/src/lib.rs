//! Askdoc LLM — the external language model consumed by enrichment and
//! answering.
//!
//! The `LanguageModel` trait is the narrow seam; `OpenAiCompatModel` talks to
//! any OpenAI-compatible `/chat/completions` endpoint, `StaticModel` is a
//! deterministic stand-in for tests and offline runs.

pub mod client;
pub mod json;
pub mod model;

pub use client::OpenAiCompatModel;
pub use json::extract_json;
pub use model::{GenerateOptions, LanguageModel, StaticModel};
