//! Column-projected CSV export

use super::{ExportError, ExportResult};
use crate::{field_str, Record};
use csv::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// Rows between periodic flushes
const FLUSH_INTERVAL: u64 = 1000;

/// Default column set for Form 471 funding-request exports
pub const FORM_471_EXPORT_COLUMNS: [&str; 13] = [
    "funding_year",
    "organization_name",
    "state",
    "form_471_frn_status_name",
    "funding_commitment_request",
    "application_number",
    "funding_request_number",
    "nickname",
    "form_471_service_type_name",
    "pending_reason",
    "fcdl_comment_frn",
    "dis_pct",
    "organization_entity_type_name",
];

/// Streaming CSV writer that projects records onto a fixed column set.
///
/// The header row is written at creation, so even an empty export produces
/// a parseable file. Cell values come from [`field_str`]: missing fields
/// and JSON nulls become empty strings, non-string scalars their JSON
/// rendering.
pub struct CsvExporter {
    writer: Writer<BufWriter<File>>,
    columns: Vec<String>,
    rows_written: u64,
}

impl CsvExporter {
    /// Create the output file and write the header row.
    ///
    /// Parent directories are created as needed.
    pub fn create<P, I, S>(path: P, columns: I) -> ExportResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        info!(path = %path.display(), columns = columns.len(), "creating CSV export");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = Writer::from_writer(BufWriter::new(file));
        writer.write_record(&columns)?;

        Ok(Self {
            writer,
            columns,
            rows_written: 0,
        })
    }

    /// Columns this exporter projects onto
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Write one record as a row.
    pub fn write_record(&mut self, record: &Record) -> ExportResult<()> {
        let row: Vec<String> = self
            .columns
            .iter()
            .map(|column| field_str(record, column))
            .collect();
        self.writer.write_record(&row)?;
        self.rows_written += 1;

        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
            debug!(rows = self.rows_written, "CSV export progress");
        }
        Ok(())
    }

    /// Write every record in `records`.
    pub fn write_all(&mut self, records: &[Record]) -> ExportResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush buffered rows to the file.
    pub fn flush(&mut self) -> ExportResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush, sync, and close the output file.
    pub fn close(mut self) -> ExportResult<()> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| ExportError::Finalize(e.to_string()))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| ExportError::Finalize(e.to_string()))?;
        file.sync_all()?;

        info!(rows = self.rows_written, "CSV export closed");
        Ok(())
    }
}
