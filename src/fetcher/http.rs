//! Socrata HTTP client
//!
//! One shared [`reqwest::Client`] behind a thin wrapper that knows the
//! service base URL, applies the [`RetryPolicy`] to every page request,
//! and consults the injected [`QueryCache`] before touching the network.

use super::cache::{NoCache, QueryCache};
use super::query::SodaQuery;
use super::retry::RetryPolicy;
use super::{FetchError, FetchResult};
use crate::Record;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-request timeout applied to every page request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between successive page requests on the success path
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

/// HTTP client for a Socrata-style open-data service.
///
/// Cloning is cheap; the underlying connection pool and cache are shared.
#[derive(Clone)]
pub struct SocrataClient {
    http: Arc<reqwest::Client>,
    base_url: String,
    retry: RetryPolicy,
    cache: Arc<dyn QueryCache>,
    page_delay: Duration,
}

impl SocrataClient {
    /// Create a client for the service at `base_url`.
    ///
    /// The client starts with the default [`RetryPolicy`], no cache, and a
    /// 30-second per-request timeout.
    pub fn new(base_url: impl Into<String>) -> FetchResult<Self> {
        Self::with_request_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// Only the individual HTTP request is bounded; a multi-page fetch as
    /// a whole has no deadline.
    pub fn with_request_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("erate-open-data/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let base_url = base_url.into();
        Ok(Self {
            http: Arc::new(http),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            cache: Arc::new(NoCache),
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Inject a page-result cache
    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the pause between successive page requests
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Pause applied between successive page requests
    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// The retry policy applied to each page request
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Full URL of a dataset resource
    pub fn resource_url(&self, dataset: &str) -> String {
        format!("{}/resource/{}.json", self.base_url, dataset)
    }

    /// Fetch one page of records.
    ///
    /// Applies the retry policy: rate-limited responses back off
    /// exponentially and retry the same page, timeouts and transport
    /// errors pause briefly and retry, and any other non-success status
    /// returns immediately. The error returned after exhausted retries is
    /// the one observed on the final attempt.
    pub async fn get_page(&self, dataset: &str, query: &SodaQuery) -> FetchResult<Vec<Record>> {
        let fingerprint = query.fingerprint(dataset);
        if let Some(hit) = self.cache.get(&fingerprint) {
            debug!(fingerprint = %fingerprint, records = hit.len(), "cache hit");
            return Ok(hit);
        }

        let url = self.resource_url(dataset);
        let params = query.params();
        let max_attempts = self.retry.max_attempts();
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=max_attempts {
            match self.http.get(&url).query(&params).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        let records: Vec<Record> = response
                            .json()
                            .await
                            .map_err(|e| FetchError::Decode(e.to_string()))?;
                        self.cache.put(&fingerprint, &records);
                        return Ok(records);
                    }

                    if !self.retry.retries_status(status) {
                        // Terminal for this fetch; the caller decides what
                        // to do with whatever it already accumulated.
                        return Err(FetchError::Http { status });
                    }

                    last_error = Some(if status == 429 {
                        FetchError::RateLimited { attempts: attempt }
                    } else {
                        FetchError::Http { status }
                    });
                    if attempt < max_attempts {
                        let wait = self.retry.backoff(attempt);
                        warn!(
                            status,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "retryable status; backing off before retry"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(FetchError::Timeout(e.to_string()));
                    if attempt < max_attempts {
                        let wait = self.retry.timeout_delay();
                        warn!(
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "request timed out; retrying"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e) => {
                    last_error = Some(FetchError::Network(e.to_string()));
                    if attempt < max_attempts {
                        let wait = self.retry.timeout_delay();
                        warn!(
                            error = %e,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "network error; retrying"
                        );
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FetchError::Network("request attempts exhausted".to_string())))
    }
}
