//! Embedding pipeline: pluggable providers plus a SHA-256-keyed LRU
//! cache with optional disk persistence.

pub mod cache;
pub mod mock;
pub mod provider;
pub mod remote;

pub use cache::{EmbeddingCache, EmbeddingCacheConfig, EmbeddingCacheError};
pub use mock::MockProvider;
pub use provider::{EmbeddingError, EmbeddingProvider};
pub use remote::RemoteProvider;
