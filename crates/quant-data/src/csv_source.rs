//! CSV market data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use quant_core::error::DataError;
use quant_core::traits::MarketDataProvider;
use quant_core::types::{Bar, Timeframe};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Bars read from CSV files.
///
/// A directory source looks up `<SYMBOL>_<timeframe>.csv`, then
/// `<SYMBOL>.csv`. A file source serves the same file for every symbol.
pub struct CsvDataSource {
    root: PathBuf,
}

impl CsvDataSource {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            return Err(DataError::Internal(format!(
                "CSV path does not exist: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn resolve(&self, symbol: &str, timeframe: Timeframe) -> Result<PathBuf, DataError> {
        if self.root.is_file() {
            return Ok(self.root.clone());
        }

        let candidates = [
            self.root.join(format!("{}_{}.csv", symbol, timeframe)),
            self.root.join(format!("{}.csv", symbol)),
        ];
        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))
    }

    /// Every bar for `symbol`, sorted with duplicate timestamps dropped.
    pub fn load_all(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
        let path = self.resolve(symbol, timeframe)?;
        load_bars(&path)
    }
}

#[async_trait]
impl MarketDataProvider for CsvDataSource {
    async fn bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, DataError> {
        let mut bars = self.load_all(symbol, timeframe)?;
        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        let start = bars.len().saturating_sub(limit);
        Ok(bars.split_off(start))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Read and normalize one CSV file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DataError::ParseError(e.to_string()))?;

    let mut bars = Vec::new();
    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
        let bar = Bar::new(
            parse_timestamp(&record.date)?,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        );
        if bar.is_valid() {
            bars.push(bar);
        } else {
            warn!("Skipping malformed bar at {} in {}", record.date, path.display());
        }
    }

    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < before {
        debug!("Dropped {} duplicate timestamps from {}", before - bars.len(), path.display());
    }

    Ok(bars)
}

/// Parse a date, datetime or Unix timestamp into Unix milliseconds.
pub fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    let date_str = date_str.trim();

    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M"];
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // Millisecond timestamps have more than 10 digits
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!("Could not parse date: {}", date_str)))
}
