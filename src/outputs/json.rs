//! JSON output of the run summary.

use crate::aggregate::RunSummary;
use crate::error::HarvestError;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `summary` as pretty-printed JSON to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_summary(summary: &RunSummary, path: &Path) -> Result<(), HarvestError> {
    let json = serde_json::to_string_pretty(summary)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| HarvestError::io(dir.display().to_string(), e))?;
    }
    fs::write(path, json)
        .await
        .map_err(|e| HarvestError::io(path.display().to_string(), e))?;
    info!("Wrote run summary");
    Ok(())
}
