//! In-memory market data.

use std::collections::HashMap;

use async_trait::async_trait;
use quant_core::error::DataError;
use quant_core::traits::MarketDataProvider;
use quant_core::types::{Bar, BarSeries, Timeframe};
use tokio::sync::RwLock;

/// Bar series held in memory, keyed by symbol and timeframe.
///
/// Serves as a cache in front of slower providers and as a fixed data set
/// for tests and replays.
#[derive(Default)]
pub struct InMemoryMarketData {
    series: RwLock<HashMap<(String, Timeframe), BarSeries>>,
    capacity: Option<usize>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` bars per series.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            series: RwLock::default(),
            capacity: Some(capacity),
        }
    }

    /// Append bars; out-of-order or duplicate timestamps are rejected.
    /// Returns the number of bars accepted.
    pub async fn insert(&self, symbol: &str, timeframe: Timeframe, bars: impl IntoIterator<Item = Bar>) -> usize {
        let mut series = self.series.write().await;
        let entry = series
            .entry((symbol.to_string(), timeframe))
            .or_insert_with(|| match self.capacity {
                Some(capacity) => BarSeries::with_capacity(symbol, timeframe, capacity),
                None => BarSeries::new(symbol, timeframe),
            });
        entry.extend(bars)
    }

    pub async fn clear(&self, symbol: &str) {
        self.series.write().await.retain(|(s, _), _| s != symbol);
    }

    pub async fn symbols(&self) -> Vec<String> {
        let series = self.series.read().await;
        let mut symbols: Vec<String> = series.keys().map(|(s, _)| s.clone()).collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketData {
    async fn bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, DataError> {
        let series = self.series.read().await;
        let found = series
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        Ok(found.last_n(limit))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64) -> Bar {
        Bar::new(ts, 10.0, 11.0, 9.0, 10.5, 100.0)
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let data = InMemoryMarketData::new();
        assert_eq!(data.insert("AAPL", Timeframe::Daily, (0..10).map(bar)).await, 10);
        // Out of order bars are rejected
        assert_eq!(data.insert("AAPL", Timeframe::Daily, [bar(3)]).await, 0);

        let recent = data.bars("AAPL", Timeframe::Daily, 3).await.unwrap();
        assert_eq!(recent.iter().map(|b| b.timestamp).collect::<Vec<_>>(), vec![7, 8, 9]);

        assert!(data.bars("AAPL", Timeframe::Hour1, 3).await.is_err());
        assert_eq!(data.symbols().await, vec!["AAPL".to_string()]);

        data.clear("AAPL").await;
        assert!(data.symbols().await.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_bounds_series() {
        let data = InMemoryMarketData::with_capacity(5);
        data.insert("MSFT", Timeframe::Daily, (0..20).map(bar)).await;
        assert_eq!(data.bars("MSFT", Timeframe::Daily, 100).await.unwrap().len(), 5);
    }
}
