//! Knowledge Graph: property graph + vector collection + hybrid search
//! + optional reranker.
//!
//! Grounded on `llmspell-graph::types`/`llmspell-graph::traits::knowledge_graph`
//! for the Entity/Relationship shape and the storage-trait split, and on
//! `vestige_core::search::{hybrid, reranker}` for RRF-style fusion and
//! cross-encoder-with-fallback reranking. The property graph and vector
//! collection here are in-memory (`parking_lot::RwLock`-guarded maps)
//! behind the same trait boundary a real graph-database-backed store
//! would implement.

pub mod reranker;
pub mod store;

pub use reranker::{RerankedResult, Reranker, RerankerError};
pub use store::{
    Entity, EntityKind, GraphError, KnowledgeGraph, Relationship, RelationshipType, SemanticHit,
};

use serde_json::Value;
use std::collections::HashMap;

/// Convenience alias used throughout this module for entity metadata.
pub type Metadata = HashMap<String, Value>;
