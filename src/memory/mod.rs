//! Core memory engine — repositories, semantic index, and the operations
//! built on them.
//!
//! Write path lives in [`remember`], read paths in [`recall`] and [`context`],
//! curation in [`consolidate`] and [`mutate`], serialization in [`export`].
//! The typed repositories are [`entities`], [`observations`], and
//! [`relationships`]; [`index`] owns the stored vectors.

pub mod consolidate;
pub mod context;
pub mod entities;
pub mod export;
pub mod index;
pub mod mutate;
pub mod observations;
pub mod recall;
pub mod relationships;
pub mod remember;
pub mod types;

use crate::error::{MemoryError, Result};

/// Similarity above which two observations under the same entity are
/// treated as redundant on the write path.
pub const DEDUP_THRESHOLD: f32 = 0.85;

/// Minimum similarity for a semantic hit to survive into recall output.
pub const RECALL_FLOOR: f32 = 0.15;

/// Minimum similarity for `context` to accept a semantic topic match.
pub const CONTEXT_FALLBACK_THRESHOLD: f32 = 0.2;

/// Default and bounds for the consolidation clustering threshold.
pub const CONSOLIDATE_DEFAULT_THRESHOLD: f32 = 0.8;
pub const CONSOLIDATE_MIN_THRESHOLD: f32 = 0.5;

/// Tolerance for the stored-vector unit-norm invariant.
pub const NORM_TOLERANCE: f32 = 1e-4;

/// Input length caps (characters).
pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_ENTITY_NAME_LEN: usize = 200;
pub const MAX_ENTITY_TYPE_LEN: usize = 50;
pub const MAX_SOURCE_LEN: usize = 100;
pub const MAX_QUERY_LEN: usize = 500;
pub const MAX_TOPIC_LEN: usize = 200;

/// Recall result-set bounds.
pub const MAX_RECALL_LIMIT: usize = 50;
pub const DEFAULT_RECALL_LIMIT: usize = 10;

/// Entity observations are attached to when the caller names none.
pub const DEFAULT_ENTITY: &str = "general";

/// Serialize a vector as little-endian IEEE-754 f32 bytes, the on-disk
/// embedding format.
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize a stored embedding blob, validating its length.
pub fn bytes_to_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MemoryError::InvalidInput(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Dot product. Both vectors are stored unit-length, so this is cosine
/// similarity in [-1, 1].
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Strip control characters U+0000–U+0008, U+000B, U+000C, U+000E–U+001F,
/// keeping tab, LF, and CR.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}'
            )
        })
        .collect()
}

/// Escape `%`, `_`, and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Current wall-clock time as an ISO-8601 UTC string.
pub fn now_utc() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_bytes_roundtrip_is_little_endian() {
        let v = vec![1.0f32, -0.5, 0.25];
        let bytes = vector_to_bytes(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(bytes_to_vector(&bytes).unwrap(), v);
    }

    #[test]
    fn bytes_to_vector_rejects_ragged_blob() {
        assert!(bytes_to_vector(&[0u8; 7]).is_err());
    }

    #[test]
    fn dot_of_unit_vectors_is_cosine() {
        let mut a = vec![0.0f32; 384];
        let mut b = vec![0.0f32; 384];
        a[0] = 1.0;
        b[0] = 1.0;
        assert!((dot(&a, &b) - 1.0).abs() < 1e-6);

        b[0] = 0.0;
        b[1] = 1.0;
        assert!(dot(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn dot_is_symmetric() {
        let a = vec![0.6f32, 0.8, 0.0];
        let b = vec![0.0f32, 0.6, 0.8];
        assert_eq!(dot(&a, &b), dot(&b, &a));
    }

    #[test]
    fn control_chars_are_stripped() {
        let input = "a\u{0000}b\u{0007}c\u{000B}d\u{001F}e";
        assert_eq!(strip_control_chars(input), "abcde");
    }

    #[test]
    fn whitespace_control_chars_survive() {
        let input = "line one\nline two\ttabbed\r";
        assert_eq!(strip_control_chars(input), input);
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like("100%_done\\x"), "100\\%\\_done\\\\x");
    }
}
