//! Signal scan command implementation.

use anyhow::{Context, Result};
use quant_config::AppConfig;
use quant_data::MemoryStore;
use quant_risk::RiskManager;
use quant_signals::{MarketHours, ScanReport, Scheduler, SignalEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cli::ScanArgs;

pub async fn run(args: ScanArgs, config: &AppConfig) -> Result<()> {
    let mut engine_config = config.engine.clone();
    if args.ignore_hours {
        engine_config.market_hours = MarketHours::always_open();
    }
    if let Some(secs) = args.interval_secs {
        engine_config.scan_interval_secs = secs;
    }

    let store = Arc::new(MemoryStore::new());
    let risk = Arc::new(RiskManager::new(store.clone(), config.app.capital, config.risk.clone())?);
    let engine = Arc::new(
        SignalEngine::new(
            engine_config,
            risk,
            super::strategies(config, None)?,
            super::market_data(config)?,
            store,
        )
        .context("Failed to start signal engine")?,
    );

    if args.once {
        let report = engine.run_cycle().await;
        print_report(&report);
        return Ok(());
    }

    let handle = Scheduler::spawn(engine.clone());
    match args.duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
        }
    }
    handle.stop().await;

    let signals = engine.get_signals(None, 50).await?;
    println!("{} signals this session", signals.len());
    for signal in signals {
        println!(
            "  {}  {:<6} {:<4} {:>5.1}%  {:<18} {}",
            signal.timestamp.format("%Y-%m-%d %H:%M"),
            signal.symbol,
            signal.direction.to_string(),
            signal.confidence,
            signal.strategy_id,
            signal.reason
        );
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    println!(
        "Cycle {:?}: {} scanned, {} blocked, {} errors{}",
        report.outcome,
        report.symbols_scanned,
        report.symbols_blocked,
        report.errors,
        if report.aborted { " (aborted)" } else { "" }
    );
    for signal in &report.signals {
        println!(
            "  {:<6} {:<4} {:>5.1}%  {:<18} stop {:.2} target {:.2}  {}",
            signal.symbol,
            signal.direction.to_string(),
            signal.confidence,
            signal.strategy_id,
            signal.stop_loss.unwrap_or_default(),
            signal.take_profit.unwrap_or_default(),
            signal.reason
        );
    }
}
