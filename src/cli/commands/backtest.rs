//! Backtest command implementation.

use anyhow::{Context, Result};
use quant_backtest::{generate_performance_report, ComprehensiveBacktest};
use quant_config::AppConfig;
use tracing::info;

use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    let strategies = super::strategies(config, args.strategy.as_deref())?;
    info!(
        "Backtesting {} strategies on {} over {} bars",
        strategies.len(),
        args.symbol,
        args.days
    );

    let runner = ComprehensiveBacktest::new(super::market_data(config)?, strategies, config.backtest.clone())?
        .with_timeframe(config.engine.timeframe);
    let results = runner
        .run_comprehensive_backtest(&args.symbol, args.days)
        .await
        .with_context(|| format!("Backtest on {} failed", args.symbol))?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => println!("{}", generate_performance_report(&results)),
    }

    if let Some(path) = &args.save {
        std::fs::write(path, serde_json::to_string_pretty(&results)?)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Results saved to {:?}", path);
    }

    if let (Some(path), Some(first)) = (&args.equity_csv, results.first()) {
        std::fs::write(path, first.equity_to_csv()).with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Equity curve for {} saved to {:?}", first.strategy_id, path);
    }

    Ok(())
}
