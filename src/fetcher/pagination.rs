//! Offset-based pagination over a capped tabular endpoint
//!
//! The remote service bounds how many records one request may return, so a
//! full extraction walks the resource in `$limit`/`$offset` windows. The
//! loop here stitches those windows together and stops on the first empty
//! page, on a short page, or once an optional record cap is reached.
//! Terminal errors do not propagate: the scan aborts and hands back
//! whatever it accumulated, leaving the "is partial good enough" decision
//! to the caller.

use super::http::SocrataClient;
use super::query::SodaQuery;
use super::FetchError;
use crate::Record;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Ceiling on page requests in a single scan.
///
/// A scan that hits this many pages without seeing the end of the data is
/// aborted as partial; it exists so a misbehaving endpoint that keeps
/// returning full pages cannot loop the fetcher forever.
pub const MAX_PAGES: usize = 10_000;

/// Page size used when a query arrives without `$limit`
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Result of a multi-page scan.
///
/// `records` is always meaningful: on a clean run it is the complete
/// result set, and on an aborted run it holds everything accumulated
/// before the failure, with `complete` false and `error` naming the cause.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Records in the order the server returned them
    pub records: Vec<Record>,
    /// Number of page requests that returned successfully
    pub pages: usize,
    /// True when the scan saw the natural end of the data (or hit the
    /// requested record cap)
    pub complete: bool,
    /// The error that stopped an incomplete scan
    pub error: Option<FetchError>,
}

impl SocrataClient {
    /// Retrieve the complete result set for a filtered query.
    ///
    /// `where_clause` and `order` are opaque server-side expressions;
    /// `batch_size` is the page size requested from the service and
    /// `max_records` (0 = unlimited) truncates the accumulated result.
    /// Pages are requested strictly sequentially with a short pause
    /// between them.
    pub async fn fetch_all(
        &self,
        dataset: &str,
        where_clause: Option<&str>,
        order: Option<&str>,
        batch_size: usize,
        max_records: usize,
    ) -> FetchOutcome {
        let mut query = SodaQuery::new().with_limit(batch_size);
        if let Some(clause) = where_clause {
            query = query.with_where(clause);
        }
        if let Some(order) = order {
            query = query.with_order(order);
        }
        self.fetch_pages(dataset, query, max_records, None).await
    }

    /// Run the pagination loop for an arbitrary base query.
    ///
    /// The query's `$offset` is overwritten per page; its other parameters
    /// (including `$select`/`$group` aggregation expressions) pass through
    /// untouched. `progress`, when given, advances by the record count of
    /// each page. No consistency snapshot is taken across pages - if the
    /// dataset mutates mid-scan, records may be missed or repeated.
    pub async fn fetch_pages(
        &self,
        dataset: &str,
        query: SodaQuery,
        max_records: usize,
        progress: Option<&ProgressBar>,
    ) -> FetchOutcome {
        let batch_size = query.limit().unwrap_or(DEFAULT_BATCH_SIZE);
        let query = query.with_limit(batch_size);

        let span = tracing::info_span!("fetch_pages", dataset, batch_size);
        let _enter = span.enter();

        let mut outcome = FetchOutcome::default();
        let mut offset = 0usize;

        loop {
            if outcome.pages >= MAX_PAGES {
                warn!(
                    pages = outcome.pages,
                    "page ceiling reached; aborting scan with partial results"
                );
                outcome.error = Some(FetchError::PageLimit(MAX_PAGES));
                break;
            }

            let page_query = query.clone().with_offset(offset);
            match self.get_page(dataset, &page_query).await {
                Ok(page) => {
                    outcome.pages += 1;
                    let got = page.len();
                    debug!(offset, got, page = outcome.pages, "fetched page");

                    if got == 0 {
                        outcome.complete = true;
                        break;
                    }

                    outcome.records.extend(page);
                    if let Some(bar) = progress {
                        bar.inc(got as u64);
                    }

                    if max_records > 0 && outcome.records.len() >= max_records {
                        outcome.records.truncate(max_records);
                        outcome.complete = true;
                        debug!(max_records, "record cap reached");
                        break;
                    }

                    if got < batch_size {
                        // Short page: the server ran out of data
                        outcome.complete = true;
                        break;
                    }

                    offset += got;
                    tokio::time::sleep(self.page_delay()).await;
                }
                Err(e) => {
                    warn!(
                        offset,
                        accumulated = outcome.records.len(),
                        error = %e,
                        "aborting scan; returning partial results"
                    );
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        info!(
            records = outcome.records.len(),
            pages = outcome.pages,
            complete = outcome.complete,
            "scan finished"
        );
        outcome
    }
}
