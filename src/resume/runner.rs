//! Resumable multi-item fetch driver

use super::ledger::{LedgerError, ProgressLedger};
use crate::fetcher::FetchError;
use crate::{FetchResult, Record};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that abort a resumable run
#[derive(Debug, Error)]
pub enum ResumeError {
    /// The progress ledger could not be flushed
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A per-item fetch failed terminally.
    ///
    /// Completions since the last checkpoint are not flushed on this
    /// path; they are redone when the run is restarted, the same as after
    /// an external kill.
    #[error("run aborted on item '{key}': {source}")]
    Aborted {
        /// Work-item key being fetched when the run aborted
        key: String,
        /// The fetch error that stopped the run
        #[source]
        source: FetchError,
    },
}

/// Counts from one resumable run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Work items passed in
    pub total: usize,
    /// Items fetched during this run
    pub fetched: usize,
    /// Items skipped because the ledger already held them
    pub skipped: usize,
}

/// Process `work_items` with per-item durability.
///
/// Loads the ledger at `progress_path` (absent or corrupt means empty),
/// skips keys it already marks completed, and calls `per_item_fetch` for
/// the rest. Results are recorded in the ledger, which is flushed after
/// every `checkpoint_interval` new completions and once more at the end,
/// so an interruption loses at most `checkpoint_interval - 1` completed
/// items. `item_delay` paces the external calls.
///
/// Per-item calls are at-least-once: items completed after the last
/// flush are re-fetched on restart. That is safe because a fetch has no
/// side effect beyond producing a value - redundant work, not
/// incorrectness. Negative results ("no data for this key") should be
/// recorded by `per_item_fetch` as an `Ok` record so the key still counts
/// as completed; an `Err` is treated as an interruption and aborts the
/// run without a final flush.
pub async fn fetch_with_resume<F, Fut>(
    work_items: &[String],
    mut per_item_fetch: F,
    progress_path: &Path,
    checkpoint_interval: usize,
    item_delay: Duration,
) -> Result<RunReport, ResumeError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = FetchResult<Record>>,
{
    let mut ledger = ProgressLedger::load(progress_path);
    let mut report = RunReport {
        total: work_items.len(),
        ..Default::default()
    };
    let mut since_flush = 0usize;

    info!(
        total = work_items.len(),
        already_completed = ledger.completed_count(),
        path = %progress_path.display(),
        "starting resumable run"
    );

    for key in work_items {
        if ledger.is_completed(key) {
            report.skipped += 1;
            debug!(key = %key, "skipping completed item");
            continue;
        }

        let record = per_item_fetch(key.clone()).await.map_err(|e| {
            ResumeError::Aborted {
                key: key.clone(),
                source: e,
            }
        })?;

        ledger.record(key.clone(), record);
        report.fetched += 1;
        since_flush += 1;

        if checkpoint_interval > 0 && since_flush >= checkpoint_interval {
            ledger.save(progress_path)?;
            since_flush = 0;
        }

        if !item_delay.is_zero() {
            tokio::time::sleep(item_delay).await;
        }
    }

    ledger.save(progress_path)?;
    info!(
        fetched = report.fetched,
        skipped = report.skipped,
        "resumable run finished"
    );
    Ok(report)
}
