//! CLI command for listing the dataset catalog

use crate::catalog::DatasetCatalog;
use anyhow::{Context, Result};
use clap::Args;

/// Datasets subcommand
#[derive(Debug, Args)]
pub struct DatasetsCommand {
    #[command(subcommand)]
    action: DatasetsAction,
}

/// Datasets actions
#[derive(Debug, clap::Subcommand)]
enum DatasetsAction {
    /// List the known dataset aliases and their resource identifiers
    List {
        /// Output format
        #[arg(long, default_value = "human")]
        format: ListFormat,
    },
}

/// Output format for the datasets command
#[derive(Debug, Clone, clap::ValueEnum)]
enum ListFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl DatasetsCommand {
    /// Execute the datasets command
    pub async fn execute(&self) -> Result<()> {
        match &self.action {
            DatasetsAction::List { format } => self.execute_list(format),
        }
    }

    /// Execute the list subcommand
    fn execute_list(&self, format: &ListFormat) -> Result<()> {
        let catalog = DatasetCatalog::load_embedded()?;
        let entries = catalog.entries();

        match format {
            ListFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&entries)
                        .context("Failed to serialize catalog to JSON")?
                );
            }
            ListFormat::Human => {
                println!("Known datasets:\n");
                for entry in entries {
                    println!(
                        "{:<12} {}  {}",
                        entry.alias(),
                        entry.resource_id(),
                        entry.description()
                    );
                    if let Some(order) = entry.default_order() {
                        println!("{:<12} default order: {order}", "");
                    }
                }
            }
        }

        Ok(())
    }
}
