//! Query command handler.
//!
//! Ensures an index exists (restoring from the snapshot when possible),
//! runs the query, and prints ranked citations.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};
use lexrag_retrieval::RetrievalEngine;

/// Query the corpus for the most relevant passages
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub text: String,

    /// Number of chunks to retrieve (default from configuration)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");

        let engine = RetrievalEngine::new(config.clone())?;

        // Cache fast path; falls back to a full build on the first run
        if !engine.load_cached().await? {
            engine.index(false).await?;
        }

        let k = self.top_k.unwrap_or(config.retrieval.top_k as usize);
        let results = engine.search(&self.text, k).await?;

        if self.json {
            let ranked: Vec<serde_json::Value> = results
                .iter()
                .map(|(chunk, _)| {
                    serde_json::json!({
                        "text": chunk.text,
                        "source": chunk.source,
                    })
                })
                .collect();
            let output = serde_json::json!({ "rankedChunks": ranked });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        } else if results.is_empty() {
            println!("No results.");
        } else {
            for (rank, (chunk, score)) in results.iter().enumerate() {
                println!("{}. [{:.3}] {}", rank + 1, score, chunk.source);
                println!("   {}", snippet(&chunk.text, 200));
            }
        }

        Ok(())
    }
}

/// First `max` characters of `text`, cut at a char boundary.
fn snippet(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_offset, _)) => format!("{}...", &text[..byte_offset]),
        None => text.to_string(),
    }
}
