//! In-memory vector index with brute-force cosine search.

use crate::types::Chunk;
use std::collections::HashSet;

/// One indexed chunk with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Flat vector store; the corpus is small enough that scoring every entry
/// beats maintaining an approximate structure.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, chunk: Chunk, embedding: Vec<f32>) {
        debug_assert!(
            self.entries.is_empty() || embedding.len() == self.entries[0].embedding.len(),
            "all entries must share one dimensionality"
        );
        self.entries.push(IndexEntry { chunk, embedding });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct source documents across all entries.
    pub fn distinct_sources(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.chunk.source.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Entries in insertion order, for persistence.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Score every entry against `query` and return the top `k` by cosine
    /// similarity, highest first. Equal scores keep insertion order (the
    /// sort is stable), so results are reproducible run to run.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| (self.entries[i].chunk.clone(), score))
            .collect()
    }
}

/// Cosine similarity; returns 0.0 (never NaN) when either vector has zero
/// norm or the dimensions disagree.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
