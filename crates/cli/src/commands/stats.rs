//! Stats command handler.
//!
//! Reports index readiness and size without ever rebuilding.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};
use lexrag_retrieval::RetrievalEngine;

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let engine = RetrievalEngine::new(config.clone())?;

        // Restore from the snapshot if one matches, but never rebuild
        engine.load_cached().await?;
        let stats = engine.stats().await;

        if self.json {
            let output = serde_json::json!({
                "ready": stats.ready,
                "documents": stats.documents,
                "chunks": stats.chunks,
                "vocabularySize": stats.vocabulary_size,
                "fingerprint": stats.fingerprint,
                "builtAt": stats.built_at,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        } else if !stats.ready {
            println!("Index: not built (run `lexrag index`)");
        } else {
            println!("Index: ready");
            println!("  Documents: {}", stats.documents);
            println!("  Chunks: {}", stats.chunks);
            println!("  Vocabulary: {} terms", stats.vocabulary_size);
            if let Some(fingerprint) = &stats.fingerprint {
                println!("  Fingerprint: {}", fingerprint);
            }
            if let Some(built_at) = stats.built_at {
                println!("  Built: {}", built_at.to_rfc3339());
            }
        }

        Ok(())
    }
}
