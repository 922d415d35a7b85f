//! Risk report command implementation.

use anyhow::{Context, Result};
use quant_backtest::BacktestEngine;
use quant_config::AppConfig;
use quant_core::traits::TradeStore;
use quant_data::MemoryStore;
use quant_risk::RiskManager;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::cli::{OutputFormat, RiskArgs};

/// Backtest one strategy, load its trades into a store and report what
/// the risk manager makes of that history as of the last bar.
pub async fn run(args: RiskArgs, config: &AppConfig) -> Result<()> {
    let strategies = super::strategies(config, Some(&args.strategy))?;
    let bars = super::market_data(config)?
        .bars(&args.symbol, config.engine.timeframe, args.days)
        .await
        .with_context(|| format!("No bars for {}", args.symbol))?;

    let engine = BacktestEngine::new(config.backtest.clone())?;
    let mut results = Vec::with_capacity(strategies.len());
    for strategy in &strategies {
        results.push(engine.run(strategy.as_ref(), &args.symbol, &bars)?);
    }

    let store = Arc::new(MemoryStore::new());
    let mut end = None;
    for result in results {
        end = Some(result.end);
        for trade in result.trades {
            store.insert_trade(trade).await?;
        }
    }
    let Some(as_of) = end else {
        anyhow::bail!("No backtest results for {}", args.symbol);
    };
    info!("Loaded {} trades into the risk store", store.trade_count().await);

    let risk = RiskManager::new(store, config.app.capital, config.risk.clone())?;
    let can_trade = risk.check_circuit_breakers_at(&args.symbol, as_of).await;
    let metrics = risk.calculate_risk_metrics_at(as_of).await?;

    if args.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("RISK METRICS ({} as of {})", args.symbol, as_of.format("%Y-%m-%d"));
    println!("───────────────────────────────────────────────────────────");
    println!("  Total PnL:           ${:.2}", metrics.total_pnl);
    println!("  Daily PnL:           ${:.2}", metrics.daily_pnl);
    println!("  Weekly PnL:          ${:.2}", metrics.weekly_pnl);
    println!("  Current Drawdown:    {:.2}%", metrics.current_drawdown * Decimal::ONE_HUNDRED);
    println!("  Max Drawdown:        {:.2}%", metrics.max_drawdown * Decimal::ONE_HUNDRED);
    println!("  Win Rate:            {:.2}%", metrics.win_rate * Decimal::ONE_HUNDRED);
    println!("  Profit Factor:       {:.2}", metrics.profit_factor);
    println!("  Sharpe (per trade):  {:.2}", metrics.sharpe_ratio);
    println!("  Closed / Open:       {} / {}", metrics.closed_trades, metrics.open_trades);
    println!("  Consecutive Losses:  {}", metrics.consecutive_losses);
    println!();
    match risk.breaker_state().cause() {
        Some(cause) => println!("Circuit breaker TRIPPED: {}", cause),
        None if can_trade => println!("Circuit breakers armed; entries allowed"),
        None => println!("Entries blocked"),
    }
    Ok(())
}
