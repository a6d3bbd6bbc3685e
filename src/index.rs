//! In-memory similarity index over chunk embeddings.
//!
//! Exact linear scan with cosine scoring. For repositories in the
//! low-thousands of chunks a scan outperforms approximate structures once
//! build time is counted, and it keeps results exactly reproducible.

use crate::error::EngineError;

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk_id: usize,
    vector: Vec<f32>,
}

/// Fixed-dimension vector index. Entries keep insertion order, which is the
/// tie-break order for equal scores.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dim: usize,
    entries: Vec<IndexEntry>,
}

impl SimilarityIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert one chunk vector. Vectors of the wrong dimension are refused
    /// outright rather than padded or truncated.
    pub fn insert(&mut self, chunk_id: usize, vector: Vec<f32>) -> Result<(), EngineError> {
        if vector.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.entries.push(IndexEntry { chunk_id, vector });
        Ok(())
    }

    /// Top-k scan. Returns `(chunk_id, score)` pairs sorted by descending
    /// score; equal scores keep insertion order. An empty index returns an
    /// empty result, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, EngineError> {
        if query.len() != self.dim {
            return Err(EngineError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .map(|e| (e.chunk_id, cosine_similarity(query, &e.vector)))
            .collect();
        // Stable sort preserves insertion order among ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Cosine similarity between two equal-length vectors. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
