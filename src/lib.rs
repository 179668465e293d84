//! # erate-open-data
//!
//! Bulk extraction, enrichment, and export of USAC E-Rate
//! telecommunications-subsidy records from the Socrata-style open-data
//! service at `opendata.usac.org`.
//!
//! ## Features
//!
//! - Offset-based pagination that stitches a capped tabular endpoint into a
//!   single result set, with an iteration ceiling against runaway scans
//! - Explicit retry policy per page request: exponential backoff on rate
//!   limiting, fixed-delay retry on timeouts, fail-soft partial results on
//!   terminal errors
//! - Durable resume for long multi-item extractions via a JSON progress
//!   ledger flushed atomically at a configurable checkpoint interval
//! - Server-side filter construction from an enumerated filter structure
//!   (years, states, statuses, entity types) with proper quote escaping
//! - Client-side analysis: aggregate statistics, status filtering, and
//!   per-entity funding balances
//! - CSV export against a caller-supplied column allow-list, and JSON
//!   export with a `status`-tagged result envelope
//!
//! ## Quick Start
//!
//! ```no_run
//! use erate_open_data::fetcher::SocrataClient;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = SocrataClient::new("https://opendata.usac.org").unwrap();
//! let outcome = client
//!     .fetch_all(
//!         "srbr-2d59",
//!         Some("funding_year = '2024'"),
//!         Some("funding_year DESC"),
//!         5000,
//!         0,
//!     )
//!     .await;
//! println!("fetched {} records over {} pages", outcome.records.len(), outcome.pages);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Socrata HTTP client, retry policy, query builder,
//!   injectable cache, and the pagination loop
//! - [`resume`] - progress ledger and the resumable multi-item driver
//! - [`catalog`] - embedded catalog of known USAC datasets
//! - [`analysis`] - statistics, record filters, and funding balances
//! - [`enrich`] - resume-driven billed-entity enrichment flow
//! - [`output`] - CSV and JSON exporters
//! - [`cli`] - command-line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod enrich;
pub mod fetcher;
pub mod output;
pub mod resume;

pub use fetcher::{
    FetchError, FetchOutcome, FetchResult, MemoryCache, NoCache, QueryCache, RecordFilter,
    RetryPolicy, SocrataClient, SodaQuery,
};
pub use resume::{fetch_with_resume, LedgerError, ProgressLedger, ResumeError, RunReport};

use serde_json::Value;

/// One row returned by the remote endpoint.
///
/// Records are opaque field-name to value mappings; different datasets
/// return different field sets and nothing here enforces a schema. Values
/// are whatever the endpoint sent - Socrata datasets typically encode
/// everything, including numbers, as JSON strings.
pub type Record = serde_json::Map<String, Value>;

/// Read a field as a string, tolerating absence.
///
/// Missing fields and JSON nulls become the empty string. Non-string
/// scalars are rendered in their JSON form (`"42"`, `"true"`), so CSV rows
/// and display code never have to branch on the value type.
pub fn field_str(record: &Record, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Read a field as an `f64`, tolerating absence and malformed values.
///
/// Missing fields, nulls, and unparseable strings all coerce to `0.0` so
/// aggregation never fails on a sparse record.
pub fn field_f64(record: &Record, field: &str) -> f64 {
    match record.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
