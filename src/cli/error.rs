//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::enrich::EnrichError;
use crate::fetcher::FetchError;
use crate::output::ExportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Dataset catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Fetch error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Export error
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Enrichment error
    #[error("enrichment error: {0}")]
    Enrich(#[from] EnrichError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
