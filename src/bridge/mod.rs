//! Context Bridge orchestrator: wires the signature extractor, embedding
//! cache, and matcher under a latency budget and emits an enriched
//! response.
//!
//! Grounded on `vestige_core::storage::Storage`'s "one struct owns
//! cache + scheduler + metrics behind `Arc`" shape, and on
//! `llmspell-context::retrieval`'s async, deadline-bound retrieval call
//! shape.

pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::LruCache;
use crate::embedding::{EmbeddingCache, EmbeddingCacheError};
use crate::matcher::{self, Match, MatcherError, SignatureStore};
use crate::signature::{self, ConceptSimilarity, SimilarityCalculator};

pub use metrics::{Metrics, MetricsSnapshot};

const CHILD_EMBEDDING_BUDGET: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("enrichment exceeded its timeout budget")]
    Timeout,

    #[error("embedding step failed: {0}")]
    Embedding(#[from] EmbeddingCacheError),

    #[error("matcher failed: {0}")]
    Matcher(#[from] MatcherError),
}

/// Context Bridge configuration. Every field is overridable via the
/// `CONTEXT_BRIDGE_*` environment variables; unset or unparseable
/// values fall back to the documented defaults.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub enabled: bool,
    pub min_similarity: f32,
    pub max_matches: usize,
    pub enabled_tools: Vec<String>,
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_similarity: 0.7,
            max_matches: 3,
            enabled_tools: Vec::new(),
            cache_size: 100,
            cache_ttl: Duration::from_secs(15 * 60),
            timeout: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_DISABLED") {
            if matches!(v.as_str(), "true" | "1") {
                cfg.enabled = false;
            }
        }
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_MIN_SIMILARITY") {
            if let Ok(n) = v.parse::<f32>() {
                if n > 0.0 && n <= 1.0 {
                    cfg.min_similarity = n;
                }
            }
        }
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_MAX_MATCHES") {
            if let Ok(n) = v.parse::<usize>() {
                if (1..=10).contains(&n) {
                    cfg.max_matches = n;
                }
            }
        }
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_CACHE_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                if (1..=1000).contains(&n) {
                    cfg.cache_size = n;
                }
            }
        }
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_CACHE_TTL") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.cache_ttl = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("CONTEXT_BRIDGE_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.timeout = Duration::from_secs(secs);
            }
        }
        cfg
    }
}

/// Orchestrates signature extraction, embedding, and matching under a
/// hard latency budget, caching matches by fingerprint.
pub struct ContextBridge {
    config: BridgeConfig,
    match_cache: LruCache<String, Vec<Match>>,
    metrics: Metrics,
    store: Arc<dyn SignatureStore>,
    calculator: Arc<dyn SimilarityCalculator>,
    embedder: Option<Arc<EmbeddingCache>>,
}

impl ContextBridge {
    pub fn new(config: BridgeConfig, store: Arc<dyn SignatureStore>) -> Self {
        Self::with_calculator_and_embedder(config, store, Arc::new(ConceptSimilarity), None)
    }

    pub fn with_calculator_and_embedder(
        config: BridgeConfig,
        store: Arc<dyn SignatureStore>,
        calculator: Arc<dyn SimilarityCalculator>,
        embedder: Option<Arc<EmbeddingCache>>,
    ) -> Self {
        let match_cache = LruCache::new(config.cache_size, config.cache_ttl);
        Self {
            config,
            match_cache,
            metrics: Metrics::new(),
            store,
            calculator,
            embedder,
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn tool_enabled(&self, tool_name: &str) -> bool {
        self.config.enabled_tools.is_empty()
            || self.config.enabled_tools.iter().any(|t| t == tool_name)
    }

    /// Enrich `result` with the top-K most similar prior trajectories
    /// for `(tool_name, params)`, under the configured latency budget.
    pub async fn enrich_response(
        &self,
        tool_name: &str,
        params: &Map<String, Value>,
        result: Value,
    ) -> Result<Value, BridgeError> {
        if !self.config.enabled || !self.tool_enabled(tool_name) {
            return Ok(result);
        }

        let start = Instant::now();
        let deadline = start + self.config.timeout;

        let Some(mut sig) = signature::extract(tool_name, params) else {
            return Ok(result);
        };

        if let Some(embedder) = &self.embedder {
            if sig.embedding.is_none() {
                if let Some(text) = signature::text_content(params) {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let child_budget = remaining.min(CHILD_EMBEDDING_BUDGET);
                    let embedding = tokio::time::timeout(child_budget, embedder.get_or_compute(&text))
                        .await
                        .map_err(|_| BridgeError::Embedding(EmbeddingCacheError::Provider(
                            crate::embedding::EmbeddingError::Timeout,
                        )))??;
                    sig = sig.with_embedding(embedding);
                }
            }
        }

        if let Some(cached) = self.match_cache.get(&sig.fingerprint) {
            self.metrics.record_cache_hit();
            return Ok(self.build_response(result, cached));
        }
        self.metrics.record_cache_miss();

        if Instant::now() > deadline {
            self.metrics.record_timeout();
            return Err(BridgeError::Timeout);
        }

        let matches = match matcher::find_matches(
            Some(&sig),
            self.store.as_ref(),
            self.calculator.as_ref(),
            self.config.min_similarity,
            self.config.max_matches,
        )
        .await
        {
            Ok(m) => m,
            Err(e) => {
                self.metrics.record_error();
                return Err(BridgeError::Matcher(e));
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        self.metrics.record_enrichment(latency_ms, matches.len() as u64);

        if !matches.is_empty() {
            self.match_cache.set(sig.fingerprint.clone(), matches.clone());
        }

        Ok(self.build_response(result, matches))
    }

    fn build_response(&self, result: Value, matches: Vec<Match>) -> Value {
        let match_count = matches.len();
        let recommendation = if matches.is_empty() {
            String::new()
        } else {
            let avg_success: f32 =
                matches.iter().map(|m| m.success_score).sum::<f32>() / match_count as f32;
            if avg_success > 0.8 {
                "Similar past reasoning had high success rates.".to_string()
            } else if avg_success < 0.4 {
                "Similar past reasoning had low success rates - consider alternative approaches."
                    .to_string()
            } else {
                "Related past sessions found.".to_string()
            }
        };

        let similarity_mode = if self.embedder.is_some() {
            "semantic_embedding"
        } else {
            "concept_only"
        };

        let status = if matches.is_empty() {
            "no_matches"
        } else {
            "matches_found"
        };

        serde_json::json!({
            "result": result,
            "context_bridge": {
                "version": "1.0",
                "matches": matches,
                "match_count": match_count,
                "recommendation": recommendation,
                "similarity_mode": similarity_mode,
                "status": status,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CandidateWithSignature;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeStore {
        candidates: Vec<CandidateWithSignature>,
    }

    #[async_trait]
    impl SignatureStore for FakeStore {
        async fn find_candidates_with_signatures(
            &self,
            _domain: Option<&str>,
            _fingerprint_prefix: &str,
            _limit: usize,
        ) -> Result<Vec<CandidateWithSignature>, MatcherError> {
            Ok(self.candidates.clone())
        }
    }

    fn candidate(text: &str, id: &str, success: f32) -> CandidateWithSignature {
        let mut params = Map::new();
        params.insert("content".to_string(), json!(text));
        let signature = signature::extract("t", &params);
        CandidateWithSignature {
            trajectory_id: id.to_string(),
            session_id: "s".to_string(),
            description: format!("trajectory {id}"),
            success_score: success,
            quality_score: 0.9,
            signature,
        }
    }

    fn bridge(store: FakeStore) -> ContextBridge {
        let config = BridgeConfig {
            min_similarity: 0.5,
            ..Default::default()
        };
        ContextBridge::new(config, Arc::new(store))
    }

    #[tokio::test]
    async fn disabled_returns_result_unchanged() {
        let config = BridgeConfig {
            enabled: false,
            ..Default::default()
        };
        let bridge = ContextBridge::new(config, Arc::new(FakeStore { candidates: vec![] }));
        let result = json!({"ok": true});
        let out = bridge
            .enrich_response("t", &Map::new(), result.clone())
            .await
            .unwrap();
        assert_eq!(out, result);
    }

    #[tokio::test]
    async fn disabled_tool_returns_result_unchanged() {
        let config = BridgeConfig {
            enabled_tools: vec!["other_tool".to_string()],
            ..Default::default()
        };
        let bridge = ContextBridge::new(config, Arc::new(FakeStore { candidates: vec![] }));
        let result = json!({"ok": true});
        let out = bridge
            .enrich_response("my_tool", &Map::new(), result.clone())
            .await
            .unwrap();
        assert_eq!(out, result);
    }

    #[tokio::test]
    async fn no_text_content_returns_result_unchanged() {
        let bridge = bridge(FakeStore { candidates: vec![] });
        let result = json!({"ok": true});
        let out = bridge
            .enrich_response("t", &Map::new(), result.clone())
            .await
            .unwrap();
        assert_eq!(out, result);
    }

    #[tokio::test]
    async fn cache_hit_on_second_call() {
        let bridge = bridge(FakeStore {
            candidates: vec![candidate("database optimization performance", "db", 0.9)],
        });
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database optimization"));

        let _first = bridge
            .enrich_response("t", &params, json!({}))
            .await
            .unwrap();
        let _second = bridge
            .enrich_response("t", &params, json!({}))
            .await
            .unwrap();

        let snap = bridge.metrics();
        assert_eq!(snap.cache_hits, 1);
    }

    #[tokio::test]
    async fn timeout_is_fail_fast() {
        let config = BridgeConfig {
            timeout: Duration::from_nanos(1),
            ..Default::default()
        };
        let bridge = ContextBridge::new(
            config,
            Arc::new(FakeStore {
                candidates: vec![candidate("database optimization", "db", 0.9)],
            }),
        );
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database optimization"));

        let result = bridge.enrich_response("t", &params, json!({})).await;
        assert!(matches!(result, Err(BridgeError::Timeout)));
        assert_eq!(bridge.metrics().timeout_count, 1);
    }

    #[tokio::test]
    async fn high_success_recommendation() {
        let bridge = bridge(FakeStore {
            candidates: vec![candidate("database optimization performance", "db", 0.95)],
        });
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database optimization"));
        let out = bridge.enrich_response("t", &params, json!({})).await.unwrap();
        assert_eq!(
            out["context_bridge"]["recommendation"],
            json!("Similar past reasoning had high success rates.")
        );
        assert_eq!(out["context_bridge"]["status"], json!("matches_found"));
    }

    #[tokio::test]
    async fn no_matches_status() {
        let bridge = bridge(FakeStore { candidates: vec![] });
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database optimization"));
        let out = bridge.enrich_response("t", &params, json!({})).await.unwrap();
        assert_eq!(out["context_bridge"]["status"], json!("no_matches"));
        assert_eq!(out["context_bridge"]["recommendation"], json!(""));
    }
}
