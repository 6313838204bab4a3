//! Vector Math & Serialization
//!
//! Free functions operating on `&[f32]`, grounded on
//! `vestige_core::embeddings::{cosine_similarity, euclidean_distance,
//! dot_product}` but generalized per spec: mismatched lengths and
//! zero-norm vectors degrade to a defined value instead of panicking.

/// Cosine similarity in `[-1, 1]`. Returns `0.0` if the vectors have
/// different lengths or either has zero norm.
#[inline]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

/// Euclidean distance. Returns `+inf` if the vectors have different
/// lengths.
#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Dot product. Returns `0.0` if the vectors have different lengths.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2-normalize `v`. Returns `v` unchanged (cloned) if it has zero norm.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Little-endian float32 codec, 4 bytes per element. `None` in, `None`
/// out (mirrors the nil-in/nil-out contract of the source system).
pub fn serialize_f32(v: Option<&[f32]>) -> Option<Vec<u8>> {
    let v = v?;
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    Some(out)
}

/// Inverse of [`serialize_f32`]. The caller guarantees `bytes.len()` is
/// a multiple of 4; any remainder is silently dropped.
pub fn deserialize_f32(bytes: Option<&[u8]>) -> Option<Vec<f32>> {
    let bytes = bytes?;
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
