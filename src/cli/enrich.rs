//! Resumable per-entity enrichment command

use crate::catalog::DatasetCatalog;
use crate::enrich::{Enricher, DEFAULT_ITEM_DELAY};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::fetch::{print_envelope, Cli, OutputFormat};
use super::CliError;

/// Arguments for the enrich command
#[derive(Parser, Debug)]
pub struct EnrichArgs {
    /// Billed entity number to enrich; repeat the flag for more
    #[arg(long = "ben", value_name = "BEN")]
    pub bens: Vec<String>,

    /// File with one billed entity number per line
    #[arg(long)]
    pub bens_file: Option<PathBuf>,

    /// Dataset queried for each entity
    #[arg(long, default_value = "form-471")]
    pub dataset: String,

    /// Progress ledger location
    #[arg(long, default_value = "enrichment_progress.json")]
    pub ledger: PathBuf,

    /// Summary CSV location
    #[arg(long, default_value = "enrichment.csv")]
    pub output: PathBuf,

    /// Completed entities between ledger flushes (0 = final flush only)
    #[arg(long, default_value = "10")]
    pub checkpoint_interval: usize,

    /// Pause between per-entity requests, in milliseconds (default: 500)
    #[arg(long)]
    pub item_delay_ms: Option<u64>,
}

/// Read billed entity numbers from a file, one per line.
///
/// Blank lines and a leading "BEN" header row are skipped; anything that
/// is not all digits is dropped. A UTF-8 BOM on the first line is
/// tolerated.
fn read_ben_list(path: &Path) -> Result<Vec<String>, CliError> {
    let text = std::fs::read_to_string(path)?;
    let mut bens = Vec::new();
    for line in text.lines() {
        let ben = line.trim_start_matches('\u{feff}').trim();
        if ben.is_empty() || ben.eq_ignore_ascii_case("ben") {
            continue;
        }
        if ben.chars().all(|c| c.is_ascii_digit()) {
            bens.push(ben.to_string());
        }
    }
    Ok(bens)
}

/// Create a progress bar for a run with a known entity count
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb.set_message("enriching entities");
    pb
}

impl EnrichArgs {
    /// Collect the work list from the flag values and the optional file,
    /// deduplicated in first-seen order.
    fn work_list(&self) -> Result<Vec<String>, CliError> {
        let mut bens = Vec::new();
        for ben in &self.bens {
            let ben = ben.trim();
            if ben.is_empty() || !ben.chars().all(|c| c.is_ascii_digit()) {
                return Err(CliError::InvalidArgument(format!(
                    "'{ben}' is not a valid billed entity number"
                )));
            }
            bens.push(ben.to_string());
        }
        if let Some(path) = &self.bens_file {
            bens.extend(read_ben_list(path)?);
        }

        let mut seen = HashSet::new();
        bens.retain(|ben| seen.insert(ben.clone()));

        if bens.is_empty() {
            return Err(CliError::InvalidArgument(
                "no billed entity numbers given; use --ben or --bens-file".to_string(),
            ));
        }
        Ok(bens)
    }

    /// Execute the enrich command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let bens = self.work_list()?;

        let catalog = DatasetCatalog::load_embedded()?;
        let entry = catalog.require(&self.dataset)?;

        let item_delay = self
            .item_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ITEM_DELAY);
        let enricher = Enricher::new(cli.client()?, entry.resource_id())
            .with_ledger_path(&self.ledger)
            .with_output_path(&self.output)
            .with_checkpoint_interval(self.checkpoint_interval)
            .with_item_delay(item_delay);

        info!(
            entities = bens.len(),
            dataset = %self.dataset,
            ledger = %self.ledger.display(),
            "starting enrichment"
        );

        let bar = cli.show_progress().then(|| create_progress_bar(bens.len() as u64));
        let report = enricher.run(&bens, bar.clone()).await?;
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        match cli.output_format {
            OutputFormat::Json => print_envelope(&serde_json::json!({
                "status": "success",
                "total": report.total,
                "fetched": report.fetched,
                "skipped": report.skipped,
                "output": self.output.display().to_string(),
            })),
            OutputFormat::Human => {
                println!(
                    "✓ Enriched {} entities ({} fetched, {} already done) -> {}",
                    report.total,
                    report.fetched,
                    report.skipped,
                    self.output.display()
                );
            }
        }
        Ok(())
    }
}
