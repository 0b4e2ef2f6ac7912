//! Candle data loading and history output.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::Path;
use tradeframe_core::{Bar, HistoryRow};

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(seconds) = raw.parse::<i64>() {
        return Utc
            .timestamp_opt(seconds, 0)
            .single()
            .with_context(|| format!("unix timestamp out of range: {raw}"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("unparseable timestamp: {raw}"))
}

/// Load an OHLCV series from a CSV file with columns
/// `timestamp,open,high,low,close,volume`. Timestamps may be unix seconds
/// or RFC 3339. The result is sorted ascending.
///
/// # Errors
///
/// Fails on unreadable files, malformed rows, or an empty series.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open candle file {}", path.display()))?;
    let mut bars = Vec::new();
    for row in reader.deserialize() {
        let row: CsvBar = row.context("malformed candle row")?;
        bars.push(Bar {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    if bars.is_empty() {
        bail!("candle file {} contains no rows", path.display());
    }
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Write backtest history rows as CSV.
///
/// # Errors
///
/// Fails when the file cannot be created or a row cannot be serialized.
pub fn write_history(path: &Path, rows: &[HistoryRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create history file {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("failed to write history row")?;
    }
    writer.flush().context("failed to flush history file")?;
    Ok(())
}
