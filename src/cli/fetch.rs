//! Fetch, stats, and balance commands
//!
//! Also home to the top-level [`Cli`] parser: the global flags shared by
//! every subcommand (service base URL, page size, retry ceiling, output
//! format) live here, as do the filter flags that compile down to a
//! server-side `$where` predicate.

use crate::analysis::{FundingBalance, Statistics};
use crate::catalog::{DatasetCatalog, DEFAULT_BASE_URL};
use crate::fetcher::{FetchOutcome, RecordFilter, RetryPolicy, SocrataClient, SodaQuery};
use crate::output::{export_records, success_envelope, CsvExporter, FORM_471_EXPORT_COLUMNS};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Largest page size the service accepts per request
const MAX_BATCH_SIZE: usize = 50_000;

/// Records echoed inline in a JSON fetch envelope before truncation
const ENVELOPE_PREVIEW: usize = 100;

/// Parse and validate the requested page size
fn parse_batch_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("batch size must be at least 1".to_string());
    }
    if value > MAX_BATCH_SIZE {
        return Err(format!(
            "batch size {value} exceeds service maximum of {MAX_BATCH_SIZE}"
        ));
    }
    Ok(value)
}

/// E-Rate open data CLI
#[derive(Parser, Debug)]
#[command(name = "erate-open-data")]
#[command(about = "Fetch, analyze, and export USAC E-Rate open data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the open-data service
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Records requested per page (default: 5000, max: 50000)
    ///
    /// Larger pages mean fewer round trips for big scans; smaller pages
    /// keep memory flat and give finer-grained progress. The service caps
    /// page size at 50000 regardless of what is requested.
    #[arg(long, global = true, default_value = "5000", value_parser = parse_batch_size)]
    pub batch_size: usize,

    /// Stop after this many records (default: 0 = unlimited)
    #[arg(long, global = true, default_value = "0")]
    pub max_records: usize,

    /// Number of attempts for rate-limited requests (default: 3, range: 1-20)
    #[arg(long, global = true, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Suppress progress bars
    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,
}

impl Cli {
    /// Build the HTTP client configured by the global flags
    pub fn client(&self) -> Result<SocrataClient, CliError> {
        Ok(SocrataClient::new(&self.base_url)?
            .with_retry_policy(RetryPolicy::default().with_max_attempts(self.max_retries)))
    }

    /// Whether interactive progress bars should render
    pub fn show_progress(&self) -> bool {
        !self.quiet && matches!(self.output_format, OutputFormat::Human)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch records from a dataset and export them to CSV or JSON
    Fetch(FetchArgs),

    /// Fetch records and print summary statistics
    Stats(StatsArgs),

    /// Reconcile committed against disbursed funding for one entity
    Balance(BalanceArgs),

    /// Fetch per-entity funding summaries with durable resume
    Enrich(super::EnrichArgs),

    /// List the known datasets
    Datasets(super::DatasetsCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Server-side filter flags shared by the fetch and stats commands
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Filter by funding year (e.g., 2024)
    #[arg(long)]
    pub year: Option<u16>,

    /// Filter by two-letter state code (e.g., NY)
    #[arg(long)]
    pub state: Option<String>,

    /// Filter by funding request status; repeat the flag for an OR group
    #[arg(long)]
    pub status: Vec<String>,

    /// Filter by organization name fragment (case-insensitive substring)
    #[arg(long)]
    pub organization: Option<String>,

    /// Filter by organization entity type (e.g., "School District")
    #[arg(long)]
    pub entity_type: Option<String>,

    /// Filter by service type (e.g., "Internet Access")
    #[arg(long)]
    pub service_type: Option<String>,

    /// Filter by billed entity number
    #[arg(long)]
    pub ben: Option<String>,

    /// Raw `$where` predicate ANDed with the flags above
    #[arg(long = "where")]
    pub where_clause: Option<String>,
}

impl FilterArgs {
    /// Compile the flags into a filter
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            funding_year: self.year,
            state: self.state.clone(),
            statuses: self.status.clone(),
            organization: self.organization.clone(),
            entity_type: self.entity_type.clone(),
            service_type: self.service_type.clone(),
            ben: self.ben.clone(),
            raw: self.where_clause.clone(),
        }
    }
}

/// Arguments for fetching and exporting records
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Dataset alias (see `datasets list`)
    #[arg(long, default_value = "form-471")]
    pub dataset: String,

    /// Server-side filters
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Sort directive, e.g. "funding_year DESC" (default: per dataset)
    #[arg(long)]
    pub order: Option<String>,

    /// Output file; a .json extension selects JSON (default: timestamped CSV)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Comma-separated CSV column allow-list (default: Form 471 columns)
    #[arg(long)]
    pub columns: Option<String>,
}

/// Arguments for the statistics report
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Dataset alias (see `datasets list`)
    #[arg(long, default_value = "form-471")]
    pub dataset: String,

    /// Server-side filters
    #[command(flatten)]
    pub filter: FilterArgs,
}

/// Arguments for the funding-balance report
#[derive(Parser, Debug)]
pub struct BalanceArgs {
    /// Billed entity number to reconcile
    #[arg(long)]
    pub ben: String,

    /// Restrict the reconciliation to one funding year
    #[arg(long)]
    pub year: Option<u16>,
}

// ─── Shared scan plumbing ────────────────────────────────────────────────────

/// Create a record-count spinner for a scan with an unknown total
fn create_progress_bar(dataset: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} records {msg}")
            .expect("hardcoded template is valid"),
    );
    pb.set_message(format!("from {dataset}"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print a JSON envelope to stdout
pub(crate) fn print_envelope(envelope: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(envelope).unwrap());
}

/// Envelope for a query that matched nothing
fn no_data_envelope() -> serde_json::Value {
    json!({
        "status": "success",
        "count": 0,
        "message": "no records matched the query",
        "data": [],
    })
}

/// Catalog lookup, client construction, and the paged scan shared by the
/// fetch-and-present commands.
///
/// A scan that stops early keeps its partial records; the outcome carries
/// the terminal error so callers can surface it.
async fn run_scan(
    cli: &Cli,
    alias: &str,
    filter: &RecordFilter,
    order_override: Option<&str>,
) -> Result<FetchOutcome, CliError> {
    let catalog = DatasetCatalog::load_embedded()?;
    let entry = catalog.require(alias)?;
    let client = cli.client()?;

    let order = order_override
        .map(str::to_string)
        .or_else(|| entry.default_order().map(str::to_string));

    let mut query = SodaQuery::new().with_limit(cli.batch_size);
    if let Some(clause) = filter.to_where_clause() {
        query = query.with_where(clause);
    }
    if let Some(order) = order {
        query = query.with_order(order);
    }

    let bar = cli.show_progress().then(|| create_progress_bar(alias));
    let outcome = client
        .fetch_pages(entry.resource_id(), query, cli.max_records, bar.as_ref())
        .await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if let Some(error) = &outcome.error {
        eprintln!(
            "⚠ Scan of {alias} stopped early ({error}); continuing with {} records",
            outcome.records.len()
        );
    }
    Ok(outcome)
}

// ─── Command execution ───────────────────────────────────────────────────────

impl FetchArgs {
    /// Execute the fetch command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let filter = self.filter.to_filter();
        let outcome = run_scan(cli, &self.dataset, &filter, self.order.as_deref()).await?;

        if outcome.records.is_empty() {
            match cli.output_format {
                OutputFormat::Json => print_envelope(&no_data_envelope()),
                OutputFormat::Human => println!("✗ No records matched the query"),
            }
            return Ok(());
        }

        let path = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.dataset));

        if path.extension().is_some_and(|ext| ext == "json") {
            export_records(&path, &outcome.records)?;
        } else {
            let columns = match &self.columns {
                Some(list) => parse_columns(list)?,
                None => FORM_471_EXPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            };
            let mut exporter = CsvExporter::create(&path, columns)?;
            exporter.write_all(&outcome.records)?;
            exporter.close()?;
        }

        info!(
            dataset = %self.dataset,
            records = outcome.records.len(),
            pages = outcome.pages,
            complete = outcome.complete,
            output = %path.display(),
            "fetch finished"
        );

        match cli.output_format {
            OutputFormat::Json => {
                let preview = &outcome.records[..outcome.records.len().min(ENVELOPE_PREVIEW)];
                let mut envelope = success_envelope(preview);
                envelope["count"] = json!(outcome.records.len());
                envelope["complete"] = json!(outcome.complete);
                envelope["output"] = json!(path.display().to_string());
                if outcome.records.len() > ENVELOPE_PREVIEW {
                    envelope["note"] = json!(format!(
                        "showing first {ENVELOPE_PREVIEW} of {} records",
                        outcome.records.len()
                    ));
                }
                print_envelope(&envelope);
            }
            OutputFormat::Human => {
                println!(
                    "✓ Exported {} records to {}",
                    outcome.records.len(),
                    path.display()
                );
            }
        }
        Ok(())
    }
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let filter = self.filter.to_filter();
        let outcome = run_scan(cli, &self.dataset, &filter, None).await?;

        if outcome.records.is_empty() {
            match cli.output_format {
                OutputFormat::Json => print_envelope(&no_data_envelope()),
                OutputFormat::Human => println!("✗ No records matched the query"),
            }
            return Ok(());
        }

        let stats = Statistics::from_records(&outcome.records);
        match cli.output_format {
            OutputFormat::Json => print_envelope(&json!({
                "status": "success",
                "count": stats.total_records,
                "complete": outcome.complete,
                "statistics": stats,
            })),
            OutputFormat::Human => print!("{}", stats.render()),
        }
        Ok(())
    }
}

impl BalanceArgs {
    /// Execute the balance command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let ben = self.ben.trim();
        if ben.is_empty() || !ben.chars().all(|c| c.is_ascii_digit()) {
            return Err(CliError::InvalidArgument(format!(
                "'{ben}' is not a valid billed entity number"
            )));
        }

        let commitments = RecordFilter {
            ben: Some(ben.to_string()),
            funding_year: self.year,
            ..Default::default()
        };
        let form_471 = run_scan(cli, "form-471", &commitments, None).await?;

        if form_471.records.is_empty() {
            match cli.output_format {
                OutputFormat::Json => print_envelope(&json!({
                    "status": "success",
                    "ben": ben,
                    "message": format!("no funding requests found for entity {ben}"),
                })),
                OutputFormat::Human => {
                    println!("✗ No funding requests found for entity {ben}");
                }
            }
            return Ok(());
        }

        // The disbursement dataset names the entity key differently
        let disbursements = RecordFilter {
            funding_year: self.year,
            raw: Some(format!("billed_entity_number = '{ben}'")),
            ..Default::default()
        };
        let form_472 = run_scan(cli, "form-472", &disbursements, None).await?;

        let balance = FundingBalance::from_records(ben, &form_471.records, &form_472.records);
        match cli.output_format {
            OutputFormat::Json => print_envelope(&json!({
                "status": "success",
                "balance": balance,
                "complete": form_471.complete && form_472.complete,
            })),
            OutputFormat::Human => print!("{}", balance.render()),
        }
        Ok(())
    }
}

/// Timestamped default export path, e.g. `erate_form-471_20240131_120000.csv`
fn default_output_path(dataset: &str) -> PathBuf {
    PathBuf::from(format!(
        "erate_{dataset}_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Split a comma-separated column list, rejecting an empty result
fn parse_columns(list: &str) -> Result<Vec<String>, CliError> {
    let columns: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(CliError::InvalidArgument(
            "--columns must name at least one column".to_string(),
        ));
    }
    Ok(columns)
}
