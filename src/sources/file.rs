//! File-backed percent changes
//!
//! Reads a delimited time series of (date, adjClose) pairs ordered ascending
//! by date, as exported by the usual EOD download tools.

use crate::core::types::PercentChange;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    #[serde(rename = "date")]
    date: String,
    #[serde(rename = "adjClose")]
    adj_close: f64,
}

/// Computes consecutive-pair ratios from the file's adjusted closes.
///
/// The first record carries no defined change (nothing precedes it) and is
/// excluded from the output rather than emitted against a zero baseline.
pub fn read_percent_changes<P: AsRef<Path>>(path: P) -> Result<Vec<PercentChange>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .with_context(|| format!("Failed to open component file: {}", path.as_ref().display()))?;

    let mut changes = Vec::new();
    let mut prev: Option<f64> = None;
    for record in reader.deserialize() {
        let record: SeriesRecord = record.with_context(|| {
            format!(
                "Failed to decode component file: {}",
                path.as_ref().display()
            )
        })?;
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date in component file: {}", record.date))?;

        if let Some(prev) = prev {
            changes.push(PercentChange {
                date,
                percent: record.adj_close / prev,
            });
        }
        prev = Some(record.adj_close);
    }

    debug!(path = %path.as_ref().display(), count = changes.len(), "read file-backed percent changes");
    Ok(changes)
}
