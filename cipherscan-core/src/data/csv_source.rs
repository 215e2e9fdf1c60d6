//! Candle provider backed by a directory of CSV files.
//!
//! One file per (symbol, timeframe): `{dir}/{SYMBOL}_{timeframe}.csv`, e.g.
//! `BTC_15m.csv`, with header `timestamp,open,high,low,close,volume`.
//! Timestamps are RFC 3339 or epoch milliseconds. Empty price cells load as
//! NaN and become gaps.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::provider::{CandleProvider, ProviderError};
use crate::domain::{Candle, CandleSeries, Timeframe};

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), timeframe.as_str()))
    }
}

impl CandleProvider for CsvDirectoryProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError> {
        let path = self.file_path(symbol, timeframe);
        if !path.exists() {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let mut candles = read_candles(&path)?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(CandleSeries::new(symbol, timeframe, candles)?)
    }
}

/// Read every row of a candle CSV file.
pub fn read_candles(path: &Path) -> Result<Vec<Candle>, ProviderError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ProviderError::Other(format!("open {}: {e}", path.display())))?;

    let mut candles = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| {
            ProviderError::ResponseFormatChanged(format!("{} row {}: {e}", path.display(), line + 1))
        })?;
        candles.push(Candle {
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            volume: row.volume.unwrap_or(f64::NAN),
        });
    }
    Ok(candles)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| ProviderError::ResponseFormatChanged(format!("invalid timestamp: {raw}")));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::ResponseFormatChanged(format!("invalid timestamp {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn reads_and_truncates_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "BTC_15m.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,1,2,0.5,1.5,10\n\
             2024-01-01T00:15:00Z,1.5,2,1,1.8,11\n\
             1704069000000,1.8,2.2,1.7,2.0,12\n",
        );
        let provider = CsvDirectoryProvider::new(dir.path());
        let series = provider.fetch_candles("btc", Timeframe::M15, 2).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.candles()[0].close, 1.8);
        assert_eq!(series.candles()[1].close, 2.0);
    }

    #[test]
    fn empty_cells_become_gaps() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "ETH_1h.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:00:00Z,1,2,0.5,1.5,10\n\
             2024-01-01T01:00:00Z,,,,,\n",
        );
        let series = CsvDirectoryProvider::new(dir.path())
            .fetch_candles("ETH", Timeframe::H1, 10)
            .unwrap();
        assert!(series.candles()[1].is_void());
        assert_eq!(series.gaps().len(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvDirectoryProvider::new(dir.path())
            .fetch_candles("SOL", Timeframe::M15, 10)
            .unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound { .. }));
    }

    #[test]
    fn unordered_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "XRP_15m.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-01-01T00:15:00Z,1,1,1,1,1\n\
             2024-01-01T00:00:00Z,1,1,1,1,1\n",
        );
        let err = CsvDirectoryProvider::new(dir.path())
            .fetch_candles("XRP", Timeframe::M15, 10)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSeries(_)));
    }
}
