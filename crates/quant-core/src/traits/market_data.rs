//! Market data provider boundary.

use async_trait::async_trait;

use crate::error::DataError;
use crate::types::{Bar, Timeframe};

/// Source of historical bars.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch up to `limit` of the most recent bars, oldest first.
    async fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, DataError>;

    /// Latest bar for a symbol.
    async fn latest_bar(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<Bar>, DataError> {
        Ok(self.bars(symbol, timeframe, 1).await?.pop())
    }

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Bar>);

    #[async_trait]
    impl MarketDataProvider for Fixed {
        async fn bars(&self, _: &str, _: Timeframe, limit: usize) -> Result<Vec<Bar>, DataError> {
            let start = self.0.len().saturating_sub(limit);
            Ok(self.0[start..].to_vec())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_latest_bar_default() {
        let provider = Fixed(vec![
            Bar::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
            Bar::new(2, 2.0, 2.0, 2.0, 2.0, 2.0),
        ]);
        let latest = provider.latest_bar("X", Timeframe::Daily).await.unwrap();
        assert_eq!(latest.map(|b| b.timestamp), Some(2));
    }
}
