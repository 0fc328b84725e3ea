//! Error types for the lexrag retrieval engine.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application. Per-document failures (`DocumentFormat`) are isolated
//! and aggregated by the caller; corpus-level failures (`EmptyCorpus`) abort
//! indexing; `CacheCorruption` is internal to the cache layer and is never
//! surfaced to callers, it triggers a silent rebuild instead.

use thiserror::Error;

/// Unified error type for the lexrag retrieval engine.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic on the error path; errors must be represented and
/// propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported or unparsable document (skipped, corpus continues)
    #[error("Document format error: {0}")]
    DocumentFormat(String),

    /// No chunks available to build a weight model
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Query issued before an index exists
    #[error("Index not ready: {0}")]
    NotReady(String),

    /// Invalid caller input (empty query, bad parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unreadable or inconsistent snapshot (handled inside the cache layer)
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
