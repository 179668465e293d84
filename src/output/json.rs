//! JSON export and response envelopes

use super::ExportResult;
use crate::Record;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Write `records` to `path` as a pretty-printed JSON array.
pub fn export_records<P: AsRef<Path>>(path: P, records: &[Record]) -> ExportResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(records)?;
    std::fs::write(path, body)?;
    info!(path = %path.display(), records = records.len(), "JSON export written");
    Ok(())
}

/// Wrap records in the standard success envelope.
pub fn success_envelope(records: &[Record]) -> Value {
    json!({
        "status": "success",
        "count": records.len(),
        "generated_at": Utc::now().to_rfc3339(),
        "data": records,
    })
}

/// Build the standard error envelope.
pub fn error_envelope(message: &str) -> Value {
    json!({
        "status": "error",
        "message": message,
    })
}
