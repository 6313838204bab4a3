//! # Retrieval Core
//!
//! Retrieval-and-learning subsystem for a reasoning server: given a
//! tool invocation, find semantically-similar past reasoning
//! trajectories under a hard latency budget, and learn which reasoning
//! strategies perform best per problem class.
//!
//! Four tightly coupled components:
//!
//! - **Context Bridge** ([`bridge`]) — enriches a tool response with
//!   the top-K most similar prior trajectories.
//! - **Embedding pipeline** ([`embedding`]) — pluggable embedding
//!   providers with a SHA-256-keyed LRU cache and optional disk
//!   persistence.
//! - **Knowledge Graph** ([`graph`]) — hybrid vector + bounded-hop
//!   graph search over entities and relationships.
//! - **Thompson-Sampling selector** ([`thompson`]) — a Bayesian bandit
//!   over reasoning strategies.
//!
//! Shared primitives: a generic LRU cache ([`cache`]), vector math and
//! float32 codec ([`vector`]), and signature extraction with
//! similarity scoring ([`signature`]) feeding the [`matcher`].
//!
//! This crate is a library; it does not own a server event loop, a CLI,
//! or the signature/graph storage backends — those are external
//! collaborators reached through the [`matcher::SignatureStore`],
//! [`graph::KnowledgeGraph`]'s embedder/reranker hooks, and the
//! [`embedding::EmbeddingProvider`] trait respectively.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use retrieval_core::bridge::{BridgeConfig, ContextBridge};
//! use std::sync::Arc;
//!
//! let bridge = ContextBridge::new(BridgeConfig::from_env(), signature_store);
//! let enriched = bridge.enrich_response("reason_step", &params, result).await?;
//! ```

pub mod bridge;
pub mod cache;
pub mod embedding;
pub mod graph;
pub mod matcher;
pub mod signature;
pub mod thompson;
pub mod vector;

pub use bridge::{BridgeConfig, BridgeError, ContextBridge, Metrics, MetricsSnapshot};
pub use cache::{CacheStats, LruCache};
pub use embedding::{
    EmbeddingCache, EmbeddingCacheConfig, EmbeddingCacheError, EmbeddingError, EmbeddingProvider,
    MockProvider, RemoteProvider,
};
pub use graph::{
    Entity, EntityKind, GraphError, KnowledgeGraph, Relationship, RelationshipType, Reranker,
    RerankerError,
};
pub use matcher::{CandidateWithSignature, Match, MatcherError, SignatureStore};
pub use signature::{ConceptSimilarity, EmbeddingSimilarity, Signature, SimilarityCalculator};
pub use thompson::{Outcome, Strategy, ThompsonError, ThompsonSelector};

/// Convenience re-export of the crate's most commonly used types.
pub mod prelude {
    pub use crate::bridge::{BridgeConfig, ContextBridge};
    pub use crate::cache::LruCache;
    pub use crate::embedding::{EmbeddingCache, EmbeddingProvider};
    pub use crate::graph::{Entity, KnowledgeGraph, Relationship};
    pub use crate::matcher::{Match, SignatureStore};
    pub use crate::signature::{Signature, SimilarityCalculator};
    pub use crate::thompson::{Strategy, ThompsonSelector};
}
