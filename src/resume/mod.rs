//! Durable resume for multi-item extractions
//!
//! A long bulk extraction over many work-item keys survives interruption
//! through the [`ProgressLedger`]: completed keys and their fetched
//! records are flushed to disk at a checkpoint interval, and a restart
//! skips everything the ledger already holds. [`fetch_with_resume`] is the
//! driver that ties the two together.

pub mod ledger;
pub mod runner;

pub use ledger::{LedgerError, LedgerResult, ProgressLedger};
pub use runner::{fetch_with_resume, ResumeError, RunReport};
