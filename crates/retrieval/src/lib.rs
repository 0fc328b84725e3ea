//! Legal document retrieval.
//!
//! Indexes a directory of legal documents (plain text, Markdown, HTML) into
//! overlapping word-window chunks, embeds each chunk as a feature-hashed
//! TF-IDF vector, and serves cosine similarity search returning the source
//! passages as citations. A fingerprinted SQLite snapshot makes re-indexing
//! an unchanged corpus a fast restore instead of a rebuild.

pub mod cache;
pub mod chunker;
pub mod corpus;
pub mod embedder;
pub mod engine;
pub mod index;
pub mod loader;
pub mod model;
pub mod snapshot;
pub mod tokenize;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::RetrievalEngine;
pub use types::{Chunk, Citation, CorpusStats, IndexReport, QueryResponse};
