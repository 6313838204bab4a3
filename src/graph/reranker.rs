//! Second-stage scorer that reorders a short candidate list against a
//! query using a more expensive signal than cosine similarity.
//!
//! Grounded on `vestige_core::search::reranker`'s cross-encoder-with-
//! fallback pattern. The remote cross-encoder provider itself is out of
//! scope (external collaborator); this module keeps the trait boundary
//! and ships the local BM25 fallback the teacher falls back to when no
//! remote reranker is configured or it errors.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RerankerError {
    #[error("reranker received an empty document list")]
    EmptyDocuments,

    #[error("reranker backend error: {0}")]
    Backend(String),
}

/// One reranked result: the original index into the input document
/// list, and the reranker's relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankedResult {
    pub index: usize,
    pub relevance_score: f32,
}

/// Capability contract for a reranking backend.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RerankedResult>, RerankerError>;

    fn model(&self) -> &str;
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Local BM25 scorer, used as the fallback reranker when no remote
/// cross-encoder is configured.
#[cfg(feature = "rerank")]
pub struct Bm25Reranker {
    k1: f32,
    b: f32,
}

#[cfg(feature = "rerank")]
impl Default for Bm25Reranker {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[cfg(feature = "rerank")]
impl Bm25Reranker {
    pub fn new(k1: f32, b: f32) -> Self {
        Self { k1, b }
    }

    fn score(&self, query_terms: &[String], doc_terms: &[String], avg_doc_len: f32, doc_freq: &std::collections::HashMap<&str, usize>, n_docs: usize) -> f32 {
        let doc_len = doc_terms.len() as f32;
        let mut score = 0.0;
        for term in query_terms {
            let tf = doc_terms.iter().filter(|t| *t == term).count() as f32;
            if tf == 0.0 {
                continue;
            }
            let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f32;
            let idf = ((n_docs as f32 - df + 0.5) / (df + 0.5) + 1.0).ln();
            let denom = tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_doc_len.max(1.0));
            score += idf * (tf * (self.k1 + 1.0)) / denom.max(1e-6);
        }
        score
    }
}

#[cfg(feature = "rerank")]
#[async_trait]
impl Reranker for Bm25Reranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
    ) -> Result<Vec<RerankedResult>, RerankerError> {
        if documents.is_empty() {
            return Err(RerankerError::EmptyDocuments);
        }

        let query_terms = tokenize(query);
        let doc_terms: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();
        let avg_doc_len =
            doc_terms.iter().map(|d| d.len()).sum::<usize>() as f32 / doc_terms.len() as f32;

        let mut doc_freq = std::collections::HashMap::new();
        for term in &query_terms {
            let count = doc_terms
                .iter()
                .filter(|doc| doc.contains(term))
                .count();
            doc_freq.insert(term.as_str(), count);
        }

        let mut scored: Vec<RerankedResult> = doc_terms
            .iter()
            .enumerate()
            .map(|(index, terms)| RerankedResult {
                index,
                relevance_score: self.score(&query_terms, terms, avg_doc_len, &doc_freq, documents.len()),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    fn model(&self) -> &str {
        "bm25-fallback"
    }
}

#[cfg(all(test, feature = "rerank"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_documents_errors() {
        let reranker = Bm25Reranker::default();
        let result = reranker.rerank("query", &[], 5).await;
        assert!(matches!(result, Err(RerankerError::EmptyDocuments)));
    }

    #[tokio::test]
    async fn ranks_more_relevant_document_first() {
        let reranker = Bm25Reranker::default();
        let docs = vec![
            "the weather today is sunny".to_string(),
            "database optimization reduces query latency".to_string(),
        ];
        let result = reranker.rerank("database optimization query", &docs, 2).await.unwrap();
        assert_eq!(result[0].index, 1);
    }

    #[tokio::test]
    async fn truncates_to_top_k() {
        let reranker = Bm25Reranker::default();
        let docs: Vec<String> = (0..10).map(|i| format!("document number {i}")).collect();
        let result = reranker.rerank("document", &docs, 3).await.unwrap();
        assert_eq!(result.len(), 3);
    }
}
