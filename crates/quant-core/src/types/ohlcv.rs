//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::Timeframe;

/// Price/volume bar. Immutable once constructed; f64 for indicator math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[repr(C)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price `(high + low + close) / 3`, the VWAP input.
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// True range against the previous close (used by ATR).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }

    /// Whether the bar is internally consistent: finite, non-negative volume,
    /// and `low <= open, close <= high`.
    pub fn is_valid(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.volume >= 0.0
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
    }
}

/// Extract closes from a bar slice.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Extract volumes from a bar slice.
pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}

/// Check that timestamps strictly increase.
pub fn is_strictly_ordered(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

/// Per-symbol rolling bar window.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: VecDeque<Bar>,
    /// Maximum capacity (0 = unlimited)
    capacity: usize,
}

impl BarSeries {
    /// Create a new empty bar series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: VecDeque::new(),
            capacity: 0,
        }
    }

    /// Create a bar series with a maximum capacity.
    /// When capacity is reached, oldest bars are removed.
    pub fn with_capacity(symbol: impl Into<String>, timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a bar. Bars that do not advance the timestamp are rejected.
    pub fn push(&mut self, bar: Bar) -> bool {
        if let Some(last) = self.bars.back() {
            if bar.timestamp <= last.timestamp {
                return false;
            }
        }
        if self.capacity > 0 && self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        true
    }

    /// Push multiple bars, returning how many were accepted.
    pub fn extend(&mut self, bars: impl IntoIterator<Item = Bar>) -> usize {
        bars.into_iter().filter(|bar| self.push(*bar)).count()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Get a bar by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Copy of the most recent `n` bars, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Bar> {
        let start = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(start).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<Bar> {
        self.bars.iter().copied().collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_calculations() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0);

        assert!((bar.typical_price() - 103.333333).abs() < 0.001);
        assert!((bar.range() - 15.0).abs() < 0.001);
        assert!(bar.is_valid());
    }

    #[test]
    fn test_bar_true_range() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0);

        assert!((bar.true_range(None) - 15.0).abs() < 0.001);
        // Gap down from 120: |95 - 120| dominates
        assert!((bar.true_range(Some(120.0)) - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_bar() {
        assert!(!Bar::new(0, 100.0, 99.0, 101.0, 100.0, 10.0).is_valid());
        assert!(!Bar::new(0, 100.0, 101.0, 99.0, 100.0, -1.0).is_valid());
        assert!(!Bar::new(0, f64::NAN, 101.0, 99.0, 100.0, 1.0).is_valid());
    }

    #[test]
    fn test_series_capacity_and_ordering() {
        let mut series = BarSeries::with_capacity("AAPL", Timeframe::Daily, 3);

        assert!(series.push(Bar::new(1, 100.0, 101.0, 99.0, 100.5, 1000.0)));
        assert!(series.push(Bar::new(2, 100.5, 102.0, 100.0, 101.5, 1000.0)));
        assert!(series.push(Bar::new(3, 101.5, 103.0, 101.0, 102.5, 1000.0)));
        // Stale timestamp is rejected
        assert!(!series.push(Bar::new(3, 101.5, 103.0, 101.0, 102.5, 1000.0)));
        assert!(series.push(Bar::new(4, 102.5, 104.0, 102.0, 103.5, 1000.0)));

        assert_eq!(series.len(), 3);
        assert_eq!(series.get(0).map(|b| b.timestamp), Some(2));
        assert_eq!(series.last_n(2).len(), 2);
        assert_eq!(series.closes(), vec![101.5, 102.5, 103.5]);
    }

    #[test]
    fn test_ordering_helper() {
        let bars = vec![
            Bar::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(2, 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        assert!(is_strictly_ordered(&bars));
        assert!(!is_strictly_ordered(&[bars[1], bars[0]]));
        assert_eq!(closes(&bars), vec![1.0, 1.0]);
    }
}
