//! Clean command handler.

use clap::Args;
use lexrag_core::{config::AppConfig, AppResult};
use lexrag_retrieval::RetrievalEngine;

/// Remove the persisted index snapshot
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        let engine = RetrievalEngine::new(config.clone())?;
        engine.clean().await?;

        println!("Removed persisted index snapshot");

        Ok(())
    }
}
