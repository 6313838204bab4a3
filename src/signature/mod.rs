//! Signature extraction: derive a fingerprint, key concepts, domain,
//! tool sequence, and complexity score from a tool invocation's
//! parameters.
//!
//! No direct teacher analogue; nearest relatives are
//! `llmspell-context::query::analyzer` for the text-analysis idiom and
//! `vestige_core::memory::node` for the struct/derive style. Tokenization
//! follows the same plain-function style as
//! `vestige_core::search::sanitize_fts5_query`.

pub mod similarity;
mod stopwords;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub use similarity::{ConceptSimilarity, EmbeddingSimilarity, SimilarityCalculator};

/// Text fields checked, in priority order, when extracting a signature.
const TEXT_FIELDS: &[&str] = &[
    "content",
    "description",
    "problem",
    "situation",
    "question",
    "query",
    "input",
];

const PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '/', '<', '>', '@',
    '#', '$', '%', '^', '&', '*', '-', '_', '=', '+', '`', '~',
];

const MIN_CONCEPT_LEN: usize = 4;

/// Fingerprint plus derived descriptors for a piece of problem text.
/// Immutable once extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub fingerprint: String,
    pub domain: Option<String>,
    pub key_concepts: Vec<String>,
    pub tool_sequence: Vec<String>,
    pub complexity: f32,
    pub embedding: Option<Vec<f32>>,
}

impl Signature {
    /// Attach a computed embedding, populated later by the orchestrator.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn fingerprint_of(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(PUNCTUATION)
}

fn extract_key_concepts(normalized: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut concepts = Vec::new();
    for raw in normalized.split_whitespace() {
        let stripped = strip_punctuation(raw);
        if stripped.len() <= MIN_CONCEPT_LEN - 1 {
            continue;
        }
        if stopwords::is_stopword(stripped) {
            continue;
        }
        if seen.insert(stripped.to_string()) {
            concepts.push(stripped.to_string());
        }
    }
    concepts
}

fn first_text_field(params: &Map<String, Value>) -> Option<String> {
    for field in TEXT_FIELDS {
        if let Some(Value::String(s)) = params.get(*field) {
            if !s.trim().is_empty() {
                return Some(s.clone());
            }
        }
    }
    None
}

fn complexity_of(word_count: usize, concept_count: usize) -> f32 {
    let words_term = (word_count as f32 / 200.0).min(1.0) * 0.4;
    let concepts_term = (concept_count as f32 / 20.0).min(1.0) * 0.3;
    (0.3 + words_term + concepts_term).clamp(0.3, 1.0)
}

/// Expose the same text-field lookup `extract` uses internally, for
/// callers (the bridge) that need the raw text to compute an embedding
/// after signature extraction has already discarded it.
pub fn text_content(params: &Map<String, Value>) -> Option<String> {
    first_text_field(params)
}

/// Derive a [`Signature`] from a tool invocation's parameters. Returns
/// `None` (not an error) when no recognized text field is present.
pub fn extract(tool_name: &str, params: &Map<String, Value>) -> Option<Signature> {
    let raw_text = first_text_field(params)?;
    let normalized = normalize(&raw_text);
    if normalized.is_empty() {
        return None;
    }

    let fingerprint = fingerprint_of(&normalized);
    let key_concepts = extract_key_concepts(&normalized);
    let domain = match params.get("domain") {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };
    let word_count = normalized.split_whitespace().count();
    let complexity = complexity_of(word_count, key_concepts.len());

    Some(Signature {
        fingerprint,
        domain,
        key_concepts,
        tool_sequence: vec![tool_name.to_string()],
        complexity,
        embedding: None,
    })
}
