//! HTTP access to Socrata-style tabular endpoints
//!
//! # Overview
//!
//! This module owns everything between the caller and the remote open-data
//! service: the [`SocrataClient`] HTTP wrapper, the [`RetryPolicy`] applied
//! to every page request, the [`SodaQuery`]/[`RecordFilter`] builders that
//! produce `$`-prefixed query parameters, an injectable [`QueryCache`], and
//! the pagination loop that stitches capped pages into one result set.
//!
//! # Quick Start
//!
//! ```no_run
//! use erate_open_data::fetcher::{RetryPolicy, SocrataClient};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = SocrataClient::new("https://opendata.usac.org")
//!     .unwrap()
//!     .with_retry_policy(RetryPolicy::default().with_max_attempts(5));
//! let outcome = client.fetch_all("srbr-2d59", None, None, 5000, 0).await;
//! if !outcome.complete {
//!     eprintln!("partial results: {} records", outcome.records.len());
//! }
//! # }
//! ```
//!
//! # Error Handling
//!
//! [`FetchError`] separates transient failures (rate limiting, timeouts,
//! transport errors), which the client retries in place, from terminal ones
//! (unexpected HTTP status, undecodable body), which abort the current
//! request immediately. The pagination loop converts any terminal error
//! into a fail-soft partial result rather than propagating it.

pub mod cache;
pub mod http;
pub mod pagination;
pub mod query;
pub mod retry;

pub use cache::{MemoryCache, NoCache, QueryCache};
pub use http::SocrataClient;
pub use pagination::FetchOutcome;
pub use query::{RecordFilter, SodaQuery};
pub use retry::RetryPolicy;

use thiserror::Error;

/// Errors that can occur while talking to the remote endpoint
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, broken body)
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the per-request timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Rate limited by the service and retries were exhausted
    #[error("rate limited by the service after {attempts} attempts")]
    RateLimited {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// The service answered with a non-success status that the retry
    /// policy does not consider retryable
    #[error("endpoint returned HTTP {status}")]
    Http {
        /// HTTP status code of the response
        status: u16,
    },

    /// The response body was not a JSON array of records
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The pagination loop hit its iteration ceiling without reaching the
    /// end of the data
    #[error("pagination exceeded {0} pages without reaching end of data")]
    PageLimit(usize),
}

impl FetchError {
    /// Whether this error class is retried in place by the client.
    ///
    /// Terminal classes abort the current fetch instead; the pagination
    /// loop then degrades to partial results.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::RateLimited { .. }
        )
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;
