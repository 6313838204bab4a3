//! In-memory property graph plus a brute-force cosine vector
//! collection, combined behind a hybrid-search operation.
//!
//! The graph database itself is out of scope; this store stands in
//! behind the same trait boundary a Neo4j-backed implementation would
//! occupy, the way `llmspell-graph::traits::knowledge_graph` separates
//! the storage trait from any particular backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::embedding::EmbeddingCache;
use crate::vector::cosine;

use super::reranker::{Reranker, RerankerError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GraphError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("relationship references an unknown entity: {0}")]
    DanglingRelationship(String),

    #[error("semantic search requires a configured embedder")]
    NoEmbedder,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("reranker failed: {0}")]
    Rerank(#[from] RerankerError),
}

/// Entity type tag. `Other` accommodates the open-ended "…" the data
/// model leaves room for beyond the named variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Concept,
    Person,
    Tool,
    File,
    Decision,
    Strategy,
    Problem,
    Other(String),
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concept => write!(f, "Concept"),
            Self::Person => write!(f, "Person"),
            Self::Tool => write!(f, "Tool"),
            Self::File => write!(f, "File"),
            Self::Decision => write!(f, "Decision"),
            Self::Strategy => write!(f, "Strategy"),
            Self::Problem => write!(f, "Problem"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Node in the knowledge graph.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub label: String,
    pub kind: EntityKind,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub metadata: HashMap<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            description: String::new(),
            created_at: 0,
            updated_at: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Directed edge type between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    Causes,
    Enables,
    Contradicts,
    BuildsUpon,
    RelatesTo,
    HasObservation,
    UsedInContext,
}

/// Directed edge between two [`Entity`] nodes.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub relationship_type: RelationshipType,
    pub strength: f32,
    pub confidence: f32,
    pub source: String,
    pub created_at: i64,
    pub metadata: HashMap<String, Value>,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            id: id.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            relationship_type,
            strength: 1.0,
            confidence: 1.0,
            source: String::new(),
            created_at: 0,
            metadata: HashMap::new(),
        }
    }
}

/// A scored hit from [`KnowledgeGraph::search_semantic`].
#[derive(Debug, Clone)]
pub struct SemanticHit {
    pub entity_id: String,
    pub similarity: f32,
}

struct VectorCollection {
    documents: HashMap<String, (Vec<f32>, String)>,
}

impl VectorCollection {
    fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }
}

fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Property graph of [`Entity`]/[`Relationship`] plus a lazily-created
/// vector collection over entity content, combined in
/// [`hybrid_search_with_threshold`](Self::hybrid_search_with_threshold).
pub struct KnowledgeGraph {
    entities: RwLock<HashMap<String, Entity>>,
    relationships: RwLock<Vec<Relationship>>,
    vectors: RwLock<Option<VectorCollection>>,
    embedder: Option<Arc<EmbeddingCache>>,
    reranker: Option<Arc<dyn Reranker>>,
}

impl KnowledgeGraph {
    pub fn new(embedder: Option<Arc<EmbeddingCache>>, reranker: Option<Arc<dyn Reranker>>) -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            relationships: RwLock::new(Vec::new()),
            vectors: RwLock::new(None),
            embedder,
            reranker,
        }
    }

    /// Write `entity` to the graph and best-effort index `content` into
    /// the semantic collection. Graph writes are fatal on failure (none
    /// occur in this in-memory implementation); embedding/indexing
    /// failures are logged and swallowed.
    pub async fn store_entity(&self, mut entity: Entity, content: &str) -> Result<(), GraphError> {
        let now = now_ts();
        {
            let entities = self.entities.read();
            entity.created_at = entities.get(&entity.id).map_or(now, |e| e.created_at);
        }
        entity.updated_at = now;

        let entity_id = entity.id.clone();
        self.entities.write().insert(entity_id.clone(), entity.clone());

        if let Some(embedder) = &self.embedder {
            match embedder.get_or_compute(content).await {
                Ok(vector) => {
                    let mut vectors = self.vectors.write();
                    let collection = vectors.get_or_insert_with(VectorCollection::new);
                    collection
                        .documents
                        .insert(entity_id, (vector, content.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, entity = %entity.id, "failed to embed entity content, skipping semantic index");
                }
            }
        }

        Ok(())
    }

    pub fn get_entity(&self, id: &str) -> Result<Entity, GraphError> {
        self.entities
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::EntityNotFound(id.to_string()))
    }

    pub fn create_relationship(&self, mut rel: Relationship) -> Result<(), GraphError> {
        let entities = self.entities.read();
        if !entities.contains_key(&rel.from_id) {
            return Err(GraphError::DanglingRelationship(rel.from_id.clone()));
        }
        if !entities.contains_key(&rel.to_id) {
            return Err(GraphError::DanglingRelationship(rel.to_id.clone()));
        }
        drop(entities);

        if rel.created_at == 0 {
            rel.created_at = now_ts();
        }
        self.relationships.write().push(rel);
        Ok(())
    }

    /// Embed `query` and return the top-`limit` entities by cosine
    /// similarity, optionally refined by a reranker.
    pub async fn search_semantic(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SemanticHit>, GraphError> {
        let embedder = self.embedder.as_ref().ok_or(GraphError::NoEmbedder)?;
        let search_limit = if self.reranker.is_some() { limit * 2 } else { limit };

        let query_vector = embedder
            .get_or_compute(query)
            .await
            .map_err(|e| GraphError::Embedding(e.to_string()))?;

        let mut hits: Vec<(String, f32, String)> = {
            let vectors = self.vectors.read();
            let Some(collection) = vectors.as_ref() else {
                return Ok(Vec::new());
            };
            collection
                .documents
                .iter()
                .map(|(id, (vector, content))| (id.clone(), cosine(&query_vector, vector), content.clone()))
                .filter(|(_, sim, _)| *sim >= min_similarity)
                .collect()
        };

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(search_limit);

        if let Some(reranker) = &self.reranker {
            if !hits.is_empty() {
                let documents: Vec<String> = hits.iter().map(|(_, _, c)| c.clone()).collect();
                let reranked = reranker.rerank(query, &documents, limit).await?;
                let mut out = Vec::with_capacity(reranked.len());
                for r in reranked {
                    out.push(SemanticHit {
                        entity_id: hits[r.index].0.clone(),
                        similarity: r.relevance_score,
                    });
                }
                return Ok(out);
            }
        }

        hits.truncate(limit);
        Ok(hits
            .into_iter()
            .map(|(entity_id, similarity, _)| SemanticHit { entity_id, similarity })
            .collect())
    }

    /// BFS from `entity_id` out to `max_hops`, optionally restricted to
    /// `rel_types`. Returns distinct entities (excluding the start node)
    /// ordered by ascending hop count, then descending `created_at`.
    pub fn search_graph(
        &self,
        entity_id: &str,
        max_hops: usize,
        rel_types: Option<&[RelationshipType]>,
    ) -> Result<Vec<Entity>, GraphError> {
        if !self.entities.read().contains_key(entity_id) {
            return Err(GraphError::EntityNotFound(entity_id.to_string()));
        }

        let relationships = self.relationships.read();
        let entities = self.entities.read();

        let mut visited: HashSet<String> = HashSet::from([entity_id.to_string()]);
        let mut frontier: VecDeque<(String, usize)> = VecDeque::from([(entity_id.to_string(), 0)]);
        let mut found: Vec<(Entity, usize)> = Vec::new();

        while let Some((current, hop)) = frontier.pop_front() {
            if hop >= max_hops {
                continue;
            }
            for rel in relationships.iter() {
                if let Some(types) = rel_types {
                    if !types.contains(&rel.relationship_type) {
                        continue;
                    }
                }
                let neighbor = if rel.from_id == current {
                    Some(&rel.to_id)
                } else if rel.to_id == current {
                    Some(&rel.from_id)
                } else {
                    None
                };
                let Some(neighbor) = neighbor else { continue };
                if visited.insert(neighbor.clone()) {
                    if let Some(e) = entities.get(neighbor) {
                        found.push((e.clone(), hop + 1));
                        frontier.push_back((neighbor.clone(), hop + 1));
                    }
                }
            }
        }

        found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.created_at.cmp(&a.0.created_at)));
        Ok(found.into_iter().map(|(e, _)| e).collect())
    }

    /// Combine semantic search (with a lowered admission threshold) and
    /// bounded-hop traversal from each seed hit.
    pub async fn hybrid_search_with_threshold(
        &self,
        query: &str,
        limit: usize,
        max_hops: usize,
        min_similarity: f32,
    ) -> Result<Vec<Entity>, GraphError> {
        let seed_threshold = (min_similarity * 0.5).max(0.3).min(min_similarity.max(0.3));

        let seeds = self.search_semantic(query, limit, seed_threshold).await?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for seed in seeds {
            match self.get_entity(&seed.entity_id) {
                Ok(entity) => {
                    if seen.insert(entity.id.clone()) {
                        out.push(entity);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, entity = %seed.entity_id, "hybrid search seed lookup failed, skipping");
                    continue;
                }
            }

            match self.search_graph(&seed.entity_id, max_hops, None) {
                Ok(reachable) => {
                    for entity in reachable {
                        if seen.insert(entity.id.clone()) {
                            out.push(entity);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, entity = %seed.entity_id, "hybrid search traversal failed for seed, skipping");
                }
            }
        }

        Ok(out)
    }
}
