//! Similarity calculators, polymorphic over
//! `calculate(Option<&Signature>, Option<&Signature>) -> f32 in [0,1]`.

use std::collections::HashSet;

use crate::vector::cosine;

use super::Signature;

/// Default embedding/concept blend weight when both an embedding and a
/// concept score are available.
const DEFAULT_EMBED_WEIGHT: f32 = 0.7;

pub trait SimilarityCalculator: Send + Sync {
    /// Score a pair of (possibly absent) signatures in `[0, 1]`.
    fn calculate(&self, a: Option<&Signature>, b: Option<&Signature>) -> f32;
}

fn jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        1.0
    } else {
        intersection as f32 / union as f32
    }
}

fn domain_match(a: &Signature, b: &Signature) -> f32 {
    match (&a.domain, &b.domain) {
        (Some(x), Some(y)) if !x.is_empty() && x == y => 1.0,
        _ => 0.0,
    }
}

/// Default similarity: weighted blend of concept Jaccard, domain
/// agreement, tool-sequence overlap, and complexity closeness.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConceptSimilarity;

impl SimilarityCalculator for ConceptSimilarity {
    fn calculate(&self, a: Option<&Signature>, b: Option<&Signature>) -> f32 {
        let (Some(a), Some(b)) = (a, b) else {
            return 0.0;
        };

        let concept_score = jaccard(&a.key_concepts, &b.key_concepts);
        let domain_score = domain_match(a, b);
        let tool_score = jaccard(&a.tool_sequence, &b.tool_sequence);
        let complexity_score = 1.0 - (a.complexity - b.complexity).abs();

        0.5 * concept_score + 0.2 * domain_score + 0.2 * tool_score + 0.1 * complexity_score
    }
}

/// Cosine similarity over embeddings, optionally blended with a concept
/// score. Returns `0.0` if either signature lacks an embedding — this
/// calculator never silently falls back to concept-only scoring.
pub struct EmbeddingSimilarity {
    concept: ConceptSimilarity,
    embed_weight: f32,
    blend_with_concepts: bool,
}

impl EmbeddingSimilarity {
    pub fn new(blend_with_concepts: bool) -> Self {
        Self {
            concept: ConceptSimilarity,
            embed_weight: DEFAULT_EMBED_WEIGHT,
            blend_with_concepts,
        }
    }

    pub fn with_weight(blend_with_concepts: bool, embed_weight: f32) -> Self {
        Self {
            concept: ConceptSimilarity,
            embed_weight,
            blend_with_concepts,
        }
    }
}

impl SimilarityCalculator for EmbeddingSimilarity {
    fn calculate(&self, a: Option<&Signature>, b: Option<&Signature>) -> f32 {
        let (Some(a), Some(b)) = (a, b) else {
            return 0.0;
        };
        let (Some(ea), Some(eb)) = (&a.embedding, &b.embedding) else {
            return 0.0;
        };

        let embed_score = cosine(ea, eb).clamp(0.0, 1.0);
        if !self.blend_with_concepts {
            return embed_score;
        }

        let concept_score = self.concept.calculate(Some(a), Some(b));
        self.embed_weight * embed_score + (1.0 - self.embed_weight) * concept_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(concepts: &[&str], domain: Option<&str>, complexity: f32) -> Signature {
        Signature {
            fingerprint: "f".to_string(),
            domain: domain.map(str::to_string),
            key_concepts: concepts.iter().map(|s| s.to_string()).collect(),
            tool_sequence: vec!["t".to_string()],
            complexity,
            embedding: None,
        }
    }

    #[test]
    fn identical_signatures_score_one() {
        let s = sig(&["database", "optimization"], Some("sql"), 0.5);
        let calc = ConceptSimilarity;
        let score = calc.calculate(Some(&s), Some(&s));
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn both_none_is_zero() {
        let calc = ConceptSimilarity;
        assert_eq!(calc.calculate(None, None), 0.0);
    }

    #[test]
    fn empty_concepts_both_sides_jaccard_one() {
        let a = sig(&[], None, 0.3);
        let b = sig(&[], None, 0.3);
        let calc = ConceptSimilarity;
        let score = calc.calculate(Some(&a), Some(&b));
        // concept=1*0.5 + domain=0*0.2 + tool=1*0.2 (both ["t"]) + complexity=1*0.1
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn embedding_similarity_zero_without_embeddings() {
        let a = sig(&["x"], None, 0.5);
        let b = sig(&["x"], None, 0.5);
        let calc = EmbeddingSimilarity::new(false);
        assert_eq!(calc.calculate(Some(&a), Some(&b)), 0.0);
    }

    #[test]
    fn embedding_similarity_uses_cosine() {
        let mut a = sig(&[], None, 0.5);
        let mut b = sig(&[], None, 0.5);
        a.embedding = Some(vec![1.0, 0.0]);
        b.embedding = Some(vec![1.0, 0.0]);
        let calc = EmbeddingSimilarity::new(false);
        let score = calc.calculate(Some(&a), Some(&b));
        assert!((score - 1.0).abs() < 1e-3);
    }

    #[test]
    fn embedding_similarity_blends_with_concepts() {
        let mut a = sig(&["database"], None, 0.5);
        let mut b = sig(&["database"], None, 0.5);
        a.embedding = Some(vec![1.0, 0.0]);
        b.embedding = Some(vec![0.0, 1.0]);
        let calc = EmbeddingSimilarity::new(true);
        let score = calc.calculate(Some(&a), Some(&b));
        // embed_score = 0, concept_score = jaccard(1) + tool(1) + complexity(1) weighted = 0.8
        assert!((score - (0.3 * 0.8)).abs() < 1e-3);
    }
}
