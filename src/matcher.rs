//! Matcher: single-query candidate retrieval, scoring, and ranking.
//!
//! Grounded on `llmspell-context::retrieval::strategy`'s single-query
//! candidate-then-score-then-sort shape — deliberately excludes the N+1
//! anti-pattern by issuing exactly one call to the signature store per
//! [`find_matches`] invocation.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::signature::{Signature, SimilarityCalculator};

/// Minimal trajectory descriptor returned by the signature store.
#[derive(Debug, Clone)]
pub struct CandidateWithSignature {
    pub trajectory_id: String,
    pub session_id: String,
    pub description: String,
    pub success_score: f32,
    pub quality_score: f32,
    pub signature: Option<Signature>,
}

/// A scored candidate returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub trajectory_id: String,
    pub session_id: String,
    pub similarity: f32,
    pub summary: String,
    pub success_score: f32,
    pub quality_score: f32,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MatcherError {
    #[error("signature store is not configured")]
    NoStore,

    #[error("similarity calculator is not configured")]
    NoCalculator,

    #[error("signature store query failed: {0}")]
    Store(String),
}

/// Collaborator interface for retrieving trajectories by domain and
/// fingerprint prefix. A single call per [`find_matches`] invocation —
/// implementations must not be queried per-candidate.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    async fn find_candidates_with_signatures(
        &self,
        domain: Option<&str>,
        fingerprint_prefix: &str,
        limit: usize,
    ) -> Result<Vec<CandidateWithSignature>, MatcherError>;
}

const CANDIDATE_LIMIT: usize = 50;
const PREFIX_LEN: usize = 8;

/// Fetch, score, filter, sort, and truncate candidates for `sig`.
pub async fn find_matches(
    sig: Option<&Signature>,
    store: &dyn SignatureStore,
    calculator: &dyn SimilarityCalculator,
    min_similarity: f32,
    max_matches: usize,
) -> Result<Vec<Match>, MatcherError> {
    let Some(sig) = sig else {
        return Ok(Vec::new());
    };

    let prefix = if sig.fingerprint.len() >= PREFIX_LEN {
        &sig.fingerprint[..PREFIX_LEN]
    } else {
        ""
    };

    let candidates = store
        .find_candidates_with_signatures(sig.domain.as_deref(), prefix, CANDIDATE_LIMIT)
        .await?;

    let mut matches: Vec<Match> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let candidate_sig = candidate.signature.as_ref()?;
            let similarity = calculator.calculate(Some(sig), Some(candidate_sig));
            if similarity < min_similarity {
                return None;
            }
            Some(Match {
                trajectory_id: candidate.trajectory_id,
                session_id: candidate.session_id,
                similarity,
                summary: candidate.description,
                success_score: candidate.success_score,
                quality_score: candidate.quality_score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(max_matches);
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ConceptSimilarity;
    use serde_json::{Map, json};

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

    fn candidate(concepts: &[&str], id: &str) -> CandidateWithSignature {
        let mut params = Map::new();
        params.insert("content".to_string(), json!(concepts.join(" ")));
        let signature = crate::signature::extract("t", &params);
        CandidateWithSignature {
            trajectory_id: id.to_string(),
            session_id: "s".to_string(),
            description: format!("trajectory {id}"),
            success_score: 0.9,
            quality_score: 0.9,
            signature,
        }
    }

    #[tokio::test]
    async fn nil_signature_returns_empty() {
        let store = FakeStore { candidates: vec![] };
        let calc = ConceptSimilarity;
        let result = find_matches(None, &store, &calc, 0.5, 3).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn filters_by_min_similarity_and_sorts_descending() {
        let store = FakeStore {
            candidates: vec![
                candidate(&["database", "optimization", "performance"], "db"),
                candidate(&["machine", "learning", "model"], "ml"),
            ],
        };
        let calc = ConceptSimilarity;
        let mut params = Map::new();
        params.insert(
            "content".to_string(),
            json!("database optimization query"),
        );
        let sig = crate::signature::extract("t", &params);

        let result = find_matches(sig.as_ref(), &store, &calc, 0.5, 3).await.unwrap();
        assert!(!result.is_empty());
        assert_eq!(result[0].trajectory_id, "db");
        for pair in result.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        for m in &result {
            assert!(m.similarity >= 0.5);
        }
    }

    #[tokio::test]
    async fn truncates_to_max_matches() {
        let store = FakeStore {
            candidates: (0..10)
                .map(|i| candidate(&["database", "optimization"], &format!("c{i}")))
                .collect(),
        };
        let calc = ConceptSimilarity;
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database optimization"));
        let sig = crate::signature::extract("t", &params);

        let result = find_matches(sig.as_ref(), &store, &calc, 0.0, 3).await.unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn candidates_without_signature_are_skipped() {
        let mut no_sig = candidate(&["database"], "nosig");
        no_sig.signature = None;
        let store = FakeStore {
            candidates: vec![no_sig],
        };
        let calc = ConceptSimilarity;
        let mut params = Map::new();
        params.insert("content".to_string(), json!("database"));
        let sig = crate::signature::extract("t", &params);

        let result = find_matches(sig.as_ref(), &store, &calc, 0.0, 3).await.unwrap();
        assert!(result.is_empty());
    }
}
