//! Word-window chunking with overlap.

use crate::types::Chunk;

/// Splits extracted document text into overlapping word windows.
///
/// Windows advance by `window - overlap` words, so consecutive chunks share
/// exactly `overlap` words and no sentence near a boundary is lost to both
/// sides. Chunk text preserves the original words (punctuation included),
/// re-joined with single spaces.
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(window: usize, overlap: usize) -> Self {
        Self { window, overlap }
    }

    /// Split `text` into chunks attributed to `source`.
    ///
    /// Empty or whitespace-only text yields no chunks. Text shorter than the
    /// window yields a single chunk covering the whole document.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }

        // overlap < window is enforced by config validation; clamp anyway so
        // the loop always advances.
        let stride = self.window.saturating_sub(self.overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut seq = 0u32;

        loop {
            let end = (start + self.window).min(words.len());
            chunks.push(Chunk {
                source: source.to_string(),
                seq,
                start_word: start,
                end_word: end,
                text: words[start..end].join(" "),
            });

            if end == words.len() {
                break;
            }
            seq += 1;
            start += stride;
        }

        tracing::debug!(
            "Chunked {} into {} windows ({} words)",
            source,
            chunks.len(),
            words.len()
        );
        chunks
    }
}
