//! Corpus-level term statistics: vocabulary and inverse document frequency.

use lexrag_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

/// Per-term bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermStats {
    /// Stable vocabulary index, assigned in first-occurrence order
    pub index: u32,

    /// Number of chunks containing the term at least once
    pub df: u32,
}

/// Term weighting model fitted over one corpus build.
///
/// Assigns every distinct term a stable index (first occurrence across
/// chunks, in corpus order) and tracks chunk-level document frequency.
/// IDF uses the smoothed form `ln(N / df) + 1` so that terms appearing in
/// every chunk still carry weight; with bare `ln(N / df)` a single-chunk
/// corpus would weight every term to zero and match nothing.
#[derive(Debug, Clone)]
pub struct WeightModel {
    terms: HashMap<String, TermStats>,
    chunk_count: u32,
}

impl WeightModel {
    /// Fit the model over the token lists of every chunk in the corpus.
    pub fn build(chunk_tokens: &[Vec<String>]) -> AppResult<Self> {
        if chunk_tokens.is_empty() {
            return Err(AppError::EmptyCorpus(
                "No chunks to index; corpus has no extractable text".to_string(),
            ));
        }

        let mut terms: HashMap<String, TermStats> = HashMap::new();

        for tokens in chunk_tokens {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens {
                if !seen.insert(token.as_str()) {
                    continue;
                }
                // New terms take the next sequential index; the map size
                // before insertion is exactly that index
                let next_index = terms.len() as u32;
                let stats = terms.entry(token.clone()).or_insert(TermStats {
                    index: next_index,
                    df: 0,
                });
                stats.df += 1;
            }
        }

        tracing::debug!(
            "Fitted weight model: {} terms over {} chunks",
            terms.len(),
            chunk_tokens.len()
        );

        Ok(Self {
            terms,
            chunk_count: chunk_tokens.len() as u32,
        })
    }

    /// Reassemble a model from persisted rows.
    pub fn from_parts(rows: Vec<(String, u32, u32)>, chunk_count: u32) -> Self {
        let terms = rows
            .into_iter()
            .map(|(term, index, df)| (term, TermStats { index, df }))
            .collect();
        Self { terms, chunk_count }
    }

    pub fn term_index(&self, term: &str) -> Option<u32> {
        self.terms.get(term).map(|s| s.index)
    }

    /// IDF weight for a term; `None` for terms outside the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.terms.get(term).map(|s| self.idf_value(s.df))
    }

    /// Index and IDF together, for callers that need both per term.
    pub fn lookup(&self, term: &str) -> Option<(u32, f32)> {
        self.terms.get(term).map(|s| (s.index, self.idf_value(s.df)))
    }

    fn idf_value(&self, df: u32) -> f32 {
        // df is at least 1 by construction; clamp so a damaged snapshot
        // cannot produce infinities
        let df = df.max(1) as f32;
        (self.chunk_count as f32 / df).ln() + 1.0
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Rows for persistence, sorted by vocabulary index.
    pub fn to_rows(&self) -> Vec<(String, u32, u32)> {
        let mut rows: Vec<(String, u32, u32)> = self
            .terms
            .iter()
            .map(|(term, stats)| (term.clone(), stats.index, stats.df))
            .collect();
        rows.sort_by_key(|(_, index, _)| *index);
        rows
    }
}
