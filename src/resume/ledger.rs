//! Progress ledger persistence
//!
//! The ledger is a single JSON file with two top-level keys: `processed`
//! (item key to fetched record) and `completed` (keys known to be
//! finished). Reads are permissive - a missing or unreadable file is an
//! empty ledger, never an error - and writes go through a temp file in
//! the target directory so a crash mid-flush leaves the previous ledger
//! intact.
//!
//! Access is single-process by design: there is no file locking, and two
//! concurrent runs pointed at the same path would overwrite each other's
//! flushes.

use crate::Record;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while persisting the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem error while writing or removing the ledger
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ledger could not be serialized
    #[error("ledger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Durable record of which work items are done and what they produced.
///
/// Ordered maps keep the serialized form deterministic, so re-flushing an
/// unchanged ledger writes identical bytes.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProgressLedger {
    /// Fetched record per completed item key
    #[serde(default)]
    processed: BTreeMap<String, Record>,

    /// Keys whose fetch attempt finished and was recorded
    #[serde(default)]
    completed: BTreeSet<String>,
}

impl ProgressLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`, treating absence or corruption as empty.
    ///
    /// A half-written or otherwise undecodable file costs the previous
    /// progress, not the run: the caller starts fresh and re-fetches.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Self>(&text) {
                Ok(ledger) => {
                    debug!(
                        path = %path.display(),
                        completed = ledger.completed.len(),
                        "loaded progress ledger"
                    );
                    ledger
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "progress ledger unreadable; starting fresh"
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "progress ledger unreadable; starting fresh"
                );
                Self::default()
            }
        }
    }

    /// Flush the ledger to `path` atomically.
    ///
    /// Writes to a temp file in the target directory, fsyncs it, then
    /// renames over the destination and syncs the directory, so the next
    /// reader sees either the previous flush or this one in full.
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => {
                fs::create_dir_all(p)?;
                p
            }
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }

        debug!(
            path = %path.display(),
            completed = self.completed.len(),
            "flushed progress ledger"
        );
        Ok(())
    }

    /// Delete the ledger file, tolerating its absence.
    ///
    /// Used as cleanup once a terminal export exists and the progress is
    /// no longer needed.
    pub fn remove(path: &Path) -> LedgerResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed progress ledger");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }

    /// Whether `key` already finished in a prior (or this) run
    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// Record the result for `key` and mark it completed
    pub fn record(&mut self, key: impl Into<String>, record: Record) {
        let key = key.into();
        self.processed.insert(key.clone(), record);
        self.completed.insert(key);
    }

    /// Result recorded for `key`, if completed
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.processed.get(key)
    }

    /// Number of completed keys
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// All recorded results, keyed by item
    pub fn processed(&self) -> &BTreeMap<String, Record> {
        &self.processed
    }
}
