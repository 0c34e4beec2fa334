//! Error types for askdoc.
//!
//! The taxonomy separates fatal configuration problems (never retried) from
//! transient external failures (retried with backoff) and the two
//! retrieval-specific conditions callers must distinguish: an oversized
//! evidence set and a corrupt persisted index.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Fatal misconfiguration: bad chunk/overlap values, embedding model or
    /// dimension mismatch, metric mismatch. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Recoverable external failure: rate limit, timeout, 5xx. Retried.
    #[error("Transient external error: {0}")]
    Transient(String),

    /// Non-transient external model failure: invalid key, rejected request,
    /// malformed response after retries.
    #[error("Model error: {0}")]
    Model(String),

    /// Source document could not be read or decoded.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Every retrieval candidate exceeds the context budget on its own.
    /// Distinct from "no results".
    #[error("Evidence budget exceeded: {0}")]
    EvidenceBudgetExceeded(String),

    /// Persisted index artifact failed validation on load.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error warrants a retry under the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
