//! Injectable page-result cache
//!
//! The cache is an explicit collaborator handed to [`SocrataClient`]
//! rather than hidden client state: short-lived CLI runs use [`NoCache`],
//! while an embedder that replays the same queries can inject
//! [`MemoryCache`] (or its own implementation) to skip repeat requests.
//!
//! [`SocrataClient`]: super::SocrataClient

use crate::Record;
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache of page results keyed by query fingerprint.
///
/// Keys come from [`SodaQuery::fingerprint`], so two requests hit the same
/// entry exactly when they target the same dataset with the same
/// parameters.
///
/// [`SodaQuery::fingerprint`]: super::SodaQuery::fingerprint
pub trait QueryCache: Send + Sync {
    /// Look up a previously stored page
    fn get(&self, fingerprint: &str) -> Option<Vec<Record>>;

    /// Store a page result
    fn put(&self, fingerprint: &str, records: &[Record]);
}

/// No-op cache; every request goes to the network.
///
/// This is the client default - a one-shot extraction never replays a
/// query, so caching would only hold memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl QueryCache for NoCache {
    fn get(&self, _fingerprint: &str) -> Option<Vec<Record>> {
        None
    }

    fn put(&self, _fingerprint: &str, _records: &[Record]) {}
}

/// In-memory cache with no eviction.
///
/// Growth is unbounded: every distinct query fingerprint stays resident
/// until the cache is dropped. Acceptable for short-lived processes and
/// bounded query sets; a long-lived embedder issuing many distinct
/// queries should provide its own evicting implementation instead.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, fingerprint: &str) -> Option<Vec<Record>> {
        // A poisoned lock degrades to a miss rather than a panic
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(fingerprint).cloned())
    }

    fn put(&self, fingerprint: &str, records: &[Record]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(fingerprint.to_string(), records.to_vec());
        }
    }
}
