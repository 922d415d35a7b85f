//! Every strategy against one symbol, in parallel.

use std::sync::Arc;

use quant_core::traits::{MarketDataProvider, SignalStrategy};
use quant_core::types::Timeframe;
use rayon::prelude::*;
use tracing::info;

use crate::{BacktestConfig, BacktestEngine, BacktestError, BacktestResult};

pub struct ComprehensiveBacktest {
    provider: Arc<dyn MarketDataProvider>,
    strategies: Vec<Arc<dyn SignalStrategy>>,
    engine: BacktestEngine,
    timeframe: Timeframe,
}

impl ComprehensiveBacktest {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        strategies: Vec<Arc<dyn SignalStrategy>>,
        config: BacktestConfig,
    ) -> Result<Self, BacktestError> {
        Ok(Self {
            provider,
            strategies,
            engine: BacktestEngine::new(config)?,
            timeframe: Timeframe::Daily,
        })
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn strategies(&self) -> &[Arc<dyn SignalStrategy>] {
        &self.strategies
    }

    /// Load the last `days` bars for `symbol` and backtest every strategy on
    /// them. Results come back in strategy order.
    pub async fn run_comprehensive_backtest(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<BacktestResult>, BacktestError> {
        let bars = self.provider.bars(symbol, self.timeframe, days).await?;
        if bars.is_empty() {
            return Err(BacktestError::NoData(symbol.to_string()));
        }
        info!(
            "Backtesting {} strategies on {} ({} bars from {})",
            self.strategies.len(),
            symbol,
            bars.len(),
            self.provider.name()
        );

        let engine = self.engine.clone();
        let strategies = self.strategies.clone();
        let symbol = symbol.to_string();

        tokio::task::spawn_blocking(move || {
            strategies
                .par_iter()
                .map(|strategy| engine.run(strategy.as_ref(), &symbol, &bars))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| BacktestError::Task(e.to_string()))?
    }
}
