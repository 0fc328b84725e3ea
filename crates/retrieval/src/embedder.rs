//! Deterministic TF-IDF embeddings via feature hashing.

use crate::model::WeightModel;
use std::collections::HashMap;

/// Fibonacci hashing multiplier (2^64 / golden ratio); spreads consecutive
/// vocabulary indices across buckets.
const HASH_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// Embeds token sequences into fixed-dimension TF-IDF vectors.
///
/// Each vocabulary term hashes to one bucket; bucket values accumulate
/// `tf * idf` and the result is L2-normalized. The same token sequence and
/// model always produce the bit-identical vector: terms are accumulated in
/// first-occurrence order, never in hash-map iteration order, so float
/// addition on colliding buckets happens in a fixed sequence.
pub struct Embedder {
    dim: usize,
}

impl Embedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Bucket for a vocabulary index.
    pub fn bucket(&self, term_index: u32) -> usize {
        let hashed = (term_index as u64).wrapping_mul(HASH_MULTIPLIER) >> 32;
        (hashed % self.dim as u64) as usize
    }

    /// Embed a token sequence against a fitted model.
    ///
    /// Tokens outside the model vocabulary contribute nothing. An empty
    /// sequence (or one with no known terms) embeds to the zero vector.
    pub fn embed(&self, tokens: &[String], model: &WeightModel) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        if tokens.is_empty() {
            return vector;
        }

        // Count occurrences, remembering first-occurrence order
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for token in tokens {
            let entry = counts.entry(token.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(token.as_str());
            }
            *entry += 1;
        }

        let total = tokens.len() as f32;
        for term in order {
            if let Some((index, idf)) = model.lookup(term) {
                let tf = counts[term] as f32 / total;
                vector[self.bucket(index)] += tf * idf;
            }
        }

        normalize(&mut vector);
        vector
    }
}

/// L2-normalize in place; the zero vector stays zero.
fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
