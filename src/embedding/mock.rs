//! Deterministic embedding provider for tests and local development.
//!
//! Seeds a PRNG from the SHA-256 digest of the input text so the same
//! text always yields the same vector, then L2-normalizes it — mirroring
//! the "seeded by text hash, unit-normalized" contract without touching
//! the network.

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};

use crate::vector::normalize;

use super::provider::{EmbeddingError, EmbeddingProvider};

/// Deterministic, hash-seeded mock [`EmbeddingProvider`].
pub struct MockProvider {
    dimension: usize,
    model: String,
}

impl MockProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model: "mock-embed-v1".to_string(),
        }
    }

    fn seed_for(text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let seed = Self::seed_for(text);
        let mut rng = StdRng::from_seed(seed);
        let raw: Vec<f32> = (0..self.dimension)
            .map(|_| rng.gen_range(-1.0_f32..1.0_f32))
            .collect();
        normalize(&raw)
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "mock"
    }
}
