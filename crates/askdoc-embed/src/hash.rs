//! Deterministic offline embedder.
//!
//! Feature-hashes word tokens into a fixed-dimension vector: each token
//! seeds a pseudo-random direction and the directions are summed, so texts
//! sharing vocabulary land near each other under cosine similarity. Not a
//! semantic model — it exists so the pipeline and its tests run with no
//! network or API key.

use askdoc_core::Result;
use async_trait::async_trait;

use crate::embedder::Embedder;

const DEFAULT_IDENTIFIER: &str = "askdoc/hash-v1";

/// Offline embedding backend with deterministic output.
pub struct HashEmbedder {
    identifier: String,
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            dimension,
        }
    }

    /// Override the reported model identifier (for mismatch tests).
    pub fn with_identifier(dimension: usize, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            dimension,
        }
    }

    fn token_direction(&self, token: &str, out: &mut [f32]) {
        let mut state = fnv1a(token.as_bytes()) | 1;
        for slot in out.iter_mut() {
            state = xorshift64(state);
            // Map to [-1, 1).
            let unit = (state >> 11) as f32 / (1u64 << 53) as f32;
            *slot += unit * 2.0 - 1.0;
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_identifier(&self) -> &str {
        &self.identifier
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            self.token_direction(&token.to_lowercase(), &mut vector);
            tokens += 1;
        }
        if tokens == 0 {
            self.token_direction(text, &mut vector);
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn xorshift64(mut state: u64) -> u64 {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("grace period for premium payment").await.unwrap();
        let b = embedder.embed("grace period for premium payment").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_is_closer() {
        let embedder = HashEmbedder::new(256);
        let base = embedder.embed("the grace period for premium payment").await.unwrap();
        let related = embedder.embed("premium payment grace period rules").await.unwrap();
        let unrelated = embedder.embed("organ donor transplantation surgery").await.unwrap();
        assert!(cosine(&base, &related) > cosine(&base, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_still_embeds() {
        let embedder = HashEmbedder::new(32);
        let vector = embedder.embed("").await.unwrap();
        assert_eq!(vector.len(), 32);
        assert!(vector.iter().any(|&v| v != 0.0));
    }
}
