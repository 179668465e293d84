//! Catalog of supported USAC open-data datasets
//!
//! The catalog maps short aliases (`form-471`, `c2-budget`, ...) to Socrata
//! resource identifiers plus per-dataset metadata such as the default sort
//! directive. It is embedded in the binary and parsed once.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Production Socrata host for USAC open data
pub const DEFAULT_BASE_URL: &str = "https://opendata.usac.org";

/// Embedded catalog data
const CATALOG_JSON: &str = include_str!("datasets.json");

/// Global catalog instance (loaded once)
static CATALOG: Lazy<Result<DatasetCatalog, CatalogError>> =
    Lazy::new(|| DatasetCatalog::from_json(CATALOG_JSON));

/// Catalog of known datasets, keyed by alias
#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    #[allow(dead_code)]
    schema_version: String,
    entries_map: BTreeMap<String, DatasetEntry>,
}

impl DatasetCatalog {
    /// Load the embedded catalog
    ///
    /// This is a singleton operation - the catalog is parsed once and cached.
    pub fn load() -> Result<&'static Self, &'static CatalogError> {
        CATALOG.as_ref()
    }

    /// Load the embedded catalog, returning an owned copy
    pub fn load_embedded() -> Result<Self, CatalogError> {
        Self::from_json(CATALOG_JSON)
    }

    fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)
            .map_err(|e| CatalogError::Parse(format!("failed to parse dataset catalog: {e}")))?;

        let mut entries_map = BTreeMap::new();
        for entry in raw.datasets {
            entries_map.insert(entry.alias.clone(), entry);
        }

        Ok(Self {
            schema_version: raw.schema_version,
            entries_map,
        })
    }

    /// All catalog entries, ordered by alias
    pub fn entries(&self) -> Vec<&DatasetEntry> {
        self.entries_map.values().collect()
    }

    /// Look up a dataset by alias
    pub fn get(&self, alias: &str) -> Option<&DatasetEntry> {
        self.entries_map.get(alias)
    }

    /// Look up a dataset by alias, erroring with the known aliases on a miss
    pub fn require(&self, alias: &str) -> Result<&DatasetEntry, CatalogError> {
        self.get(alias).ok_or_else(|| {
            let known: Vec<&str> = self.entries_map.keys().map(String::as_str).collect();
            CatalogError::UnknownDataset {
                alias: alias.to_string(),
                known: known.join(", "),
            }
        })
    }
}

/// A single dataset in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    alias: String,
    resource_id: String,
    description: String,
    default_order: Option<String>,
}

impl DatasetEntry {
    /// Short alias used on the command line
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Socrata resource identifier (the `xxxx-yyyy` part of the URL)
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Default `$order` directive, if the dataset has a useful one
    pub fn default_order(&self) -> Option<&str> {
        self.default_order.as_deref()
    }
}

/// Raw catalog structure for deserialization
#[derive(Debug, Deserialize)]
struct RawCatalog {
    schema_version: String,
    datasets: Vec<DatasetEntry>,
}

/// Errors that can occur when working with the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The embedded catalog JSON failed to parse
    #[error("catalog parse error: {0}")]
    Parse(String),

    /// The requested alias is not in the catalog
    #[error("unknown dataset '{alias}' (known: {known})")]
    UnknownDataset {
        /// Alias that was requested
        alias: String,
        /// Comma-separated list of valid aliases
        known: String,
    },
}
