//! Term tokenization shared by the weight model and the embedder.
//!
//! Index-time and query-time text must pass through the same tokenization,
//! otherwise the vocabulary lookup and the similarity signal fall apart.

use unicode_segmentation::UnicodeSegmentation;

/// Split text into lowercase terms along Unicode word boundaries.
///
/// Punctuation is dropped; words with interior apostrophes or hyphens follow
/// UAX #29 segmentation. No stop-word or frequency filtering is applied;
/// the idf weight already down-scores ubiquitous terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    lower.unicode_words().map(str::to_string).collect()
}
