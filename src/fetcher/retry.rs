//! Retry policy for page requests
//!
//! The policy is an explicit value passed to the client rather than
//! behavior baked into the transport: how many attempts a page request
//! gets, how long to back off after a rate limit, how long to pause after
//! a timeout, and which HTTP statuses are worth retrying at all.

use std::time::Duration;

/// Default number of attempts per page request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base unit for exponential backoff (the first rate-limit retry
/// waits twice this)
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling on any single backoff wait
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Fixed pause before retrying after a timeout or transport error
pub const DEFAULT_TIMEOUT_DELAY: Duration = Duration::from_secs(3);

fn rate_limit_only(status: u16) -> bool {
    status == 429
}

/// Retry behavior for a single page request.
///
/// Rate-limit waits grow as `base_backoff * 2^attempt` with the attempt
/// counter starting at 1, capped at `max_backoff`; with the defaults that
/// is 2s, 4s, 8s, ... up to 30s. Timeouts and transport errors wait a
/// fixed `timeout_delay` instead. Any non-success status outside the
/// retryable set aborts the request immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
    timeout_delay: Duration,
    retryable: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            timeout_delay: DEFAULT_TIMEOUT_DELAY,
            retryable: rate_limit_only,
        }
    }
}

impl RetryPolicy {
    /// Set the number of attempts per page request (minimum 1)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base unit for exponential rate-limit backoff
    pub fn with_base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    /// Set the ceiling on any single backoff wait
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Set the fixed pause used after timeouts and transport errors
    pub fn with_timeout_delay(mut self, delay: Duration) -> Self {
        self.timeout_delay = delay;
        self
    }

    /// Replace the retryable-status predicate.
    ///
    /// The default retries only 429; a deployment that also wants to ride
    /// out 5xx responses can widen it here.
    pub fn with_retryable_statuses(mut self, predicate: fn(u16) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    /// Number of attempts a page request gets
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base unit for exponential backoff
    pub fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Fixed pause before retrying after a timeout or transport error
    pub fn timeout_delay(&self) -> Duration {
        self.timeout_delay
    }

    /// Whether a non-success HTTP status should be retried
    pub fn retries_status(&self, status: u16) -> bool {
        (self.retryable)(status)
    }

    /// Backoff wait before the retry that follows `attempt` (1-based).
    ///
    /// `base_backoff * 2^attempt`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}
