//! CSV output of the harvested tables.
//!
//! The header line is always written, so a run that harvested nothing still
//! produces a well-formed file. Absent optional fields become empty cells.

use crate::error::HarvestError;
use crate::models::{VetoRow, VoteRow};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// A row type with a fixed column layout.
pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

impl CsvRow for VoteRow {
    const HEADER: &'static [&'static str] = &["country", "vote result", "title", "vote date", "resolution"];
}

impl CsvRow for VetoRow {
    const HEADER: &'static [&'static str] = &["vote date", "resolution", "topic", "country"];
}

/// Render `rows` as CSV text, header first.
pub fn to_csv<T: CsvRow>(rows: &[T]) -> Result<Vec<u8>, HarvestError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| HarvestError::io("<csv buffer>", e.into_error()))
}

/// Write `rows` to `path`, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = rows.len()))]
pub async fn write_rows<T: CsvRow>(rows: &[T], path: &Path) -> Result<(), HarvestError> {
    let bytes = to_csv(rows)?;
    fs::write(path, &bytes)
        .await
        .map_err(|e| HarvestError::io(path.display().to_string(), e))?;
    info!(bytes = bytes.len(), "Wrote CSV");
    Ok(())
}
