//! Tool listing command.

use clap::Args;
use coursemate_core::{config::AppConfig, AppResult};
use coursemate_rag::{open_store, CourseOutlineTool, CourseSearchTool, ToolRegistry};
use std::sync::Arc;

/// Show the tools offered to the model
#[derive(Args, Debug)]
pub struct ToolsCommand {
    /// Output the full schemas as JSON
    #[arg(long)]
    pub json: bool,
}

impl ToolsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing tools command");

        let store = open_store(config).await?;
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(store.clone())));
        registry.register(Arc::new(CourseOutlineTool::new(store)));

        let definitions = registry.definitions();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&definitions)?);
        } else {
            for definition in &definitions {
                let required = definition.required_params().join(", ");
                println!("{}: {}", definition.name, definition.description);
                println!("  required: {}", required);
            }
        }

        Ok(())
    }
}
