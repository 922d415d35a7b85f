//! CLI command implementations.

pub mod backtest;
pub mod risk;
pub mod scan;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use quant_config::AppConfig;
use quant_core::traits::{MarketDataProvider, SignalStrategy};
use quant_data::{CsvDataSource, SyntheticMarketData};
use quant_strategies::StrategyRegistry;
use std::sync::Arc;
use tracing::info;

/// Bars from the configured CSV directory, or seeded synthetic bars.
pub fn market_data(config: &AppConfig) -> Result<Arc<dyn MarketDataProvider>> {
    match &config.data.csv_dir {
        Some(dir) => {
            info!("Reading bars from {}", dir);
            let source = CsvDataSource::new(dir).with_context(|| format!("Cannot open data directory {}", dir))?;
            Ok(Arc::new(source))
        }
        None => {
            info!("Using synthetic bars (seed {})", config.data.synthetic_seed);
            Ok(Arc::new(SyntheticMarketData::new(config.data.synthetic_seed)))
        }
    }
}

/// The named strategy with its configured params, or every enabled one.
pub fn strategies(config: &AppConfig, only: Option<&str>) -> Result<Vec<Arc<dyn SignalStrategy>>> {
    let registry = StrategyRegistry::new();
    match only {
        Some(id) => {
            let params = config
                .strategies
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.params.clone())
                .unwrap_or_default();
            let strategy = registry
                .create(id, params)
                .with_context(|| format!("Failed to create strategy '{}'", id))?;
            Ok(vec![strategy])
        }
        None => registry
            .create_enabled(&config.strategies)
            .context("Failed to create strategies"),
    }
}
