//! Illustrates wiring the four components together end to end: a
//! signature-matched Context Bridge call, a knowledge-graph hybrid
//! search, and a Thompson-sampling strategy pick. Not part of the
//! published API — run with `cargo run --example wiring`.

use std::sync::Arc;

use async_trait::async_trait;
use retrieval_core::embedding::{EmbeddingCache, EmbeddingCacheConfig, MockProvider};
use retrieval_core::graph::{Entity, EntityKind, KnowledgeGraph, Relationship, RelationshipType};
use retrieval_core::matcher::{CandidateWithSignature, MatcherError, SignatureStore};
use retrieval_core::prelude::*;
use serde_json::{Map, json};

/// A signature store backed by an in-memory vector, standing in for a
/// real trajectory database.
struct InMemoryStore {
    candidates: Vec<CandidateWithSignature>,
}

#[async_trait]
impl SignatureStore for InMemoryStore {
    async fn find_candidates_with_signatures(
        &self,
        _domain: Option<&str>,
        _fingerprint_prefix: &str,
        _limit: usize,
    ) -> Result<Vec<CandidateWithSignature>, MatcherError> {
        Ok(self.candidates.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber_init();

    // -- Context Bridge: enrich a tool response with a prior trajectory. --
    let mut prior_params = Map::new();
    prior_params.insert(
        "content".to_string(),
        json!("optimized a slow database query by adding a composite index"),
    );
    let prior_signature = retrieval_core::signature::extract("reason_step", &prior_params);

    let store = Arc::new(InMemoryStore {
        candidates: vec![CandidateWithSignature {
            trajectory_id: "traj-42".to_string(),
            session_id: "session-1".to_string(),
            description: "added a composite index to cut query latency".to_string(),
            success_score: 0.93,
            quality_score: 0.88,
            signature: prior_signature,
        }],
    });

    let bridge = ContextBridge::new(BridgeConfig::from_env(), store);

    let mut params = Map::new();
    params.insert(
        "content".to_string(),
        json!("database query running slowly, considering an index"),
    );
    let enriched = bridge
        .enrich_response("reason_step", &params, json!({"status": "in_progress"}))
        .await?;
    println!("context bridge response:\n{}\n", serde_json::to_string_pretty(&enriched)?);
    println!("context bridge metrics: {:?}\n", bridge.metrics());

    // -- Knowledge Graph: store two related entities, then hybrid search. --
    let embedder = EmbeddingCache::new(
        Some(Arc::new(MockProvider::new(32))),
        EmbeddingCacheConfig::default(),
    );
    let graph = KnowledgeGraph::new(Some(embedder), None);

    let indexing = Entity::new("concept-indexing", "Composite Indexing", EntityKind::Concept);
    let query_tuning = Entity::new("concept-query-tuning", "Query Tuning", EntityKind::Concept);
    graph
        .store_entity(indexing, "composite indexes speed up multi-column lookups")
        .await?;
    graph
        .store_entity(query_tuning, "query tuning reduces database latency")
        .await?;
    graph.create_relationship(Relationship::new(
        "rel-1",
        "concept-query-tuning",
        "concept-indexing",
        RelationshipType::Enables,
    ))?;

    let hits = graph
        .hybrid_search_with_threshold("how to speed up a slow database query", 5, 1, 0.3)
        .await?;
    println!("knowledge graph hybrid search hits: {:?}\n", hits.iter().map(|e| &e.label).collect::<Vec<_>>());

    // -- Thompson Sampling: pick between two reasoning strategies. --
    let selector = ThompsonSelector::new(7);
    selector.add_strategy(Strategy::new("step-by-step", "Explicit step-by-step reasoning"));
    selector.add_strategy(Strategy::new("direct-answer", "Direct answer, no scratch work"));

    for round in 0..30 {
        let chosen = selector.select_strategy("query-optimization")?;
        let success = chosen.id == "step-by-step" || round % 4 == 0;
        selector.record_outcome(&chosen.id, success)?;
    }
    let best = selector.get_best_strategy()?;
    println!("thompson sampler's best strategy so far: {} ({:.2} success rate)", best.name, best.success_rate());

    Ok(())
}

fn tracing_subscriber_init() {
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    );
}
