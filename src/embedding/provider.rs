//! Embedding provider capability contract.
//!
//! Grounded on `vestige_core::embeddings::EmbeddingService`'s method
//! shape (`embed`, `embed_batch`, `dimensions`, `model_name`), made
//! async and trait-object-safe via `async-trait` so remote and mock
//! implementations are interchangeable behind `Arc<dyn EmbeddingProvider>`.

use async_trait::async_trait;
use thiserror::Error;

/// Failure modes surfaced by an [`EmbeddingProvider`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmbeddingError {
    #[error("embedding request timed out")]
    Timeout,

    #[error("embedding provider rate limited the request after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("embedding provider returned an error: {0}")]
    Provider(String),

    #[error("embedding request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}

/// A source of dense vector embeddings for text.
///
/// Implementations may call out to a remote HTTP endpoint or, for
/// tests, synthesize a deterministic vector locally. `embed_batch`'s
/// default forwards to `embed` one call at a time; providers that
/// support real batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many texts. Default implementation embeds sequentially;
    /// providers with a native batch endpoint should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Fixed output dimensionality for this provider's model.
    fn dimension(&self) -> usize;

    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model(&self) -> &str;

    /// Provider identifier (e.g. `"mock"`, `"openai"`).
    fn provider(&self) -> &str;
}
