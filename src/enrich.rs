//! Billed-entity enrichment
//!
//! Takes a list of billed entity numbers, fetches each entity's Form 471
//! funding requests, and reduces them to one summary row per entity. The
//! loop runs through [`fetch_with_resume`], so a killed run picks up where
//! the last checkpoint left off, and the finished summaries land in a CSV
//! with a fixed column set.

use crate::fetcher::{RecordFilter, SocrataClient, SodaQuery};
use crate::output::{CsvExporter, ExportError};
use crate::resume::{fetch_with_resume, ProgressLedger, ResumeError, RunReport};
use crate::{field_f64, field_str, FetchResult, Record};
use indicatif::ProgressBar;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Column set for the summary CSV, one row per billed entity
pub const ENRICHMENT_COLUMNS: [&str; 9] = [
    "ben",
    "organization_name",
    "state",
    "frn_count",
    "first_funding_year",
    "latest_funding_year",
    "total_committed",
    "latest_status",
    "found",
];

/// Delay between per-entity requests
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Requests fetched per entity; enough for any realistic FRN history
const DEFAULT_PAGE_LIMIT: usize = 50;

/// Ledger flush cadence, in completed entities
const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

/// Errors from an enrichment run
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The resumable fetch loop aborted or could not persist progress
    #[error(transparent)]
    Resume(#[from] ResumeError),

    /// The summary CSV could not be written
    #[error("failed to write summary CSV: {0}")]
    Export(#[from] ExportError),
}

/// Reduce one entity's funding requests to a single summary record.
///
/// `records` must be sorted newest funding year first; the latest status,
/// organization name, and state are taken from the head. An empty slice
/// produces a `found: false` row so the entity still completes and exports.
pub fn summarize_ben(ben: &str, records: &[Record]) -> Record {
    let mut summary = Record::new();
    summary.insert("ben".into(), Value::from(ben));

    if records.is_empty() {
        summary.insert("organization_name".into(), Value::from(""));
        summary.insert("state".into(), Value::from(""));
        summary.insert("frn_count".into(), Value::from(0));
        summary.insert("first_funding_year".into(), Value::from(""));
        summary.insert("latest_funding_year".into(), Value::from(""));
        summary.insert("total_committed".into(), Value::from(0.0));
        summary.insert("latest_status".into(), Value::from(""));
        summary.insert("found".into(), Value::from(false));
        return summary;
    }

    let latest = &records[0];
    let mut frns = BTreeSet::new();
    let mut years: Vec<u16> = Vec::new();
    let mut total_committed = 0.0_f64;

    for record in records {
        let frn = field_str(record, "funding_request_number");
        if !frn.is_empty() {
            frns.insert(frn);
        }
        if let Ok(year) = field_str(record, "funding_year").parse::<u16>() {
            years.push(year);
        }
        let status = field_str(record, "form_471_frn_status_name");
        if status.eq_ignore_ascii_case("funded") {
            total_committed += field_f64(record, "funding_commitment_request");
        }
    }

    let first_year = years
        .iter()
        .min()
        .map(|y| y.to_string())
        .unwrap_or_default();
    let latest_year = years
        .iter()
        .max()
        .map(|y| y.to_string())
        .unwrap_or_default();

    summary.insert(
        "organization_name".into(),
        Value::from(field_str(latest, "organization_name")),
    );
    summary.insert("state".into(), Value::from(field_str(latest, "state")));
    summary.insert("frn_count".into(), Value::from(frns.len()));
    summary.insert("first_funding_year".into(), Value::from(first_year));
    summary.insert("latest_funding_year".into(), Value::from(latest_year));
    summary.insert(
        "total_committed".into(),
        Value::from((total_committed * 100.0).round() / 100.0),
    );
    summary.insert(
        "latest_status".into(),
        Value::from(field_str(latest, "form_471_frn_status_name")),
    );
    summary.insert("found".into(), Value::from(true));
    summary
}

/// Resumable enrichment job over a list of billed entity numbers
pub struct Enricher {
    client: SocrataClient,
    resource_id: String,
    page_limit: usize,
    ledger_path: PathBuf,
    output_path: PathBuf,
    checkpoint_interval: usize,
    item_delay: Duration,
}

impl Enricher {
    /// Create an enricher against one funding-request dataset.
    pub fn new(client: SocrataClient, resource_id: impl Into<String>) -> Self {
        Self {
            client,
            resource_id: resource_id.into(),
            page_limit: DEFAULT_PAGE_LIMIT,
            ledger_path: PathBuf::from("enrichment_progress.json"),
            output_path: PathBuf::from("enrichment.csv"),
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }

    /// Override the per-entity record limit
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Override the progress ledger location
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Override the summary CSV location
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Override the ledger flush cadence
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Override the delay between per-entity requests
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Progress ledger location
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Summary CSV location
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fetch one entity's funding requests and summarize them.
    ///
    /// A successful query with no rows yields a `found: false` summary;
    /// only a failed fetch returns an error.
    pub async fn fetch_ben(&self, ben: &str) -> FetchResult<Record> {
        let filter = RecordFilter {
            ben: Some(ben.to_string()),
            ..Default::default()
        };
        let mut query = SodaQuery::new()
            .with_order("funding_year DESC")
            .with_limit(self.page_limit);
        if let Some(clause) = filter.to_where_clause() {
            query = query.with_where(clause);
        }

        let records = self.client.get_page(&self.resource_id, &query).await?;
        if records.is_empty() {
            debug!(ben, "no funding requests for entity");
        }
        Ok(summarize_ben(ben, &records))
    }

    /// Run the full enrichment flow for `bens`.
    ///
    /// Fetches every entity not already in the ledger, writes the summary
    /// CSV in input order, then removes the ledger file - once the CSV
    /// exists the ledger has served its purpose. If the run aborts midway
    /// the ledger stays behind for the next attempt.
    pub async fn run(
        &self,
        bens: &[String],
        progress: Option<ProgressBar>,
    ) -> Result<RunReport, EnrichError> {
        let this = &*self;
        let report = fetch_with_resume(
            bens,
            |ben: String| {
                let bar = progress.clone();
                async move {
                    let summary = this.fetch_ben(&ben).await?;
                    if let Some(bar) = &bar {
                        bar.inc(1);
                    }
                    Ok(summary)
                }
            },
            &self.ledger_path,
            self.checkpoint_interval,
            self.item_delay,
        )
        .await?;

        let ledger = ProgressLedger::load(&self.ledger_path);
        let mut exporter = CsvExporter::create(&self.output_path, ENRICHMENT_COLUMNS)?;
        for ben in bens {
            if let Some(record) = ledger.get(ben) {
                exporter.write_record(record)?;
            }
        }
        exporter.close()?;

        if let Err(e) = ProgressLedger::remove(&self.ledger_path) {
            warn!(path = %self.ledger_path.display(), error = %e, "could not remove finished ledger");
        }

        info!(
            entities = bens.len(),
            fetched = report.fetched,
            skipped = report.skipped,
            output = %self.output_path.display(),
            "enrichment finished"
        );
        Ok(report)
    }
}
