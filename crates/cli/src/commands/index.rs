//! Index command handler.
//!
//! Builds or refreshes the corpus index, using the persisted snapshot when
//! the document set is unchanged.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};
use lexrag_retrieval::RetrievalEngine;

/// Build or refresh the corpus index
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Rebuild even if a matching snapshot exists
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let engine = RetrievalEngine::new(config.clone())?;
        let report = engine.index(self.force).await?;

        if self.json {
            let output = serde_json::json!({
                "documents": report.documents,
                "chunks": report.chunks,
                "warnings": report.warnings,
                "durationSecs": report.duration_secs,
                "fromCache": report.from_cache,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        } else {
            if report.from_cache {
                println!(
                    "Index up to date ({} documents, {} chunks)",
                    report.documents, report.chunks
                );
            } else {
                println!(
                    "Indexed {} documents ({} chunks) in {:.2}s",
                    report.documents, report.chunks, report.duration_secs
                );
            }
            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }
        }

        Ok(())
    }
}
