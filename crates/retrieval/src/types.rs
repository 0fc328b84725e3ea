//! Retrieval system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous, possibly overlapping window of words extracted from one
/// document. The unit of retrieval.
///
/// Chunks are created once during indexing and never mutated. Identity is
/// the (source, seq) pair; word offsets locate the window inside the
/// normalized document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the owning document (path relative to the corpus root)
    pub source: String,

    /// Sequence index within the document
    pub seq: u32,

    /// First word offset (inclusive)
    pub start_word: usize,

    /// Last word offset (exclusive)
    pub end_word: usize,

    /// Text content of the window
    pub text: String,
}

/// Quoted source text attached to a retrieval result.
///
/// A derived, read-only projection of a retrieved chunk; never persisted,
/// always recomputed from a search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// The chunk text
    pub text: String,

    /// Originating document identifier
    pub source: String,
}

/// Result of a query: citations ordered by descending similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Retrieved chunks, highest similarity first
    pub ranked_chunks: Vec<Citation>,
}

/// Outcome of an indexing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    /// Number of documents successfully loaded
    pub documents: usize,

    /// Number of chunks indexed
    pub chunks: usize,

    /// Per-document failures that did not abort the pass
    pub warnings: Vec<String>,

    /// Duration in seconds
    pub duration_secs: f64,

    /// Whether the index was restored from the persisted snapshot
    pub from_cache: bool,
}

/// Introspection snapshot of the engine state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Whether an index is ready to serve queries
    pub ready: bool,

    /// Number of indexed documents
    pub documents: usize,

    /// Number of indexed chunks
    pub chunks: usize,

    /// Number of distinct vocabulary terms
    pub vocabulary_size: usize,

    /// Fingerprint of the indexed document set
    pub fingerprint: Option<String>,

    /// When the active index was built
    pub built_at: Option<DateTime<Utc>>,
}
