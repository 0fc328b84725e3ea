//! Command handlers for the lexrag CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod clean;
pub mod index;
pub mod query;
pub mod stats;

// Re-export command types for convenience
pub use clean::CleanCommand;
pub use index::IndexCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;
