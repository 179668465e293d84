//! Record export to CSV and JSON
//!
//! CSV export goes through a column allow-list: the caller names the
//! columns, every record contributes exactly those cells, and fields the
//! record lacks become empty strings. JSON export writes the records as
//! they came off the wire.

pub mod csv;
pub mod json;

pub use self::csv::{CsvExporter, FORM_471_EXPORT_COLUMNS};
pub use self::json::{error_envelope, export_records, success_envelope};

use thiserror::Error;

/// Errors that can occur during export
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem error creating or writing the output
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The output file could not be finalized on close
    #[error("failed to finalize output: {0}")]
    Finalize(String),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
