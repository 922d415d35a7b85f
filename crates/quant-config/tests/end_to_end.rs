//! Whole-pipeline checks: configuration to strategies, scans behind the risk
//! gate, and backtests with the cost model.

use std::sync::Arc;

use chrono::Utc;
use quant_backtest::{BacktestConfig, BacktestEngine};
use quant_config::load_config_with_overrides;
use quant_core::error::StrategyError;
use quant_core::traits::{ExitRules, SignalStrategy, TradeStore};
use quant_core::types::{Bar, BreakerCause, ExitReason, Side, Signal, SignalDirection, Timeframe, Trade};
use quant_data::scenarios::{from_closes, oversold_capitulation, quiet_market};
use quant_data::{InMemoryMarketData, MemoryStore, SyntheticMarketData};
use quant_risk::{RiskLimits, RiskManager};
use quant_signals::{CycleOutcome, EngineConfig, MarketHours, SignalEngine};
use quant_strategies::{MeanReversionStrategy, StrategyRegistry, StrategySettings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn scan_engine(store: Arc<MemoryStore>, symbols: &[(&str, Vec<Bar>)]) -> (Arc<RiskManager>, SignalEngine) {
    let data = InMemoryMarketData::new();
    for (symbol, bars) in symbols {
        data.insert(symbol, Timeframe::Daily, bars.clone()).await;
    }
    let risk = Arc::new(RiskManager::new(store.clone(), dec!(100000), RiskLimits::default()).unwrap());
    let config = EngineConfig {
        symbols: symbols.iter().map(|(s, _)| s.to_string()).collect(),
        market_hours: MarketHours::always_open(),
        ..EngineConfig::default()
    };
    let strategies: Vec<Arc<dyn SignalStrategy>> = vec![Arc::new(MeanReversionStrategy::default())];
    let engine = SignalEngine::new(config, risk.clone(), strategies, Arc::new(data), store).unwrap();
    (risk, engine)
}

#[tokio::test]
async fn capitulation_produces_confident_buy() {
    let store = Arc::new(MemoryStore::new());
    let (_, engine) = scan_engine(
        store.clone(),
        &[("AAPL", oversold_capitulation()), ("MSFT", quiet_market(30))],
    )
    .await;

    let report = engine.run_cycle().await;
    assert_eq!(report.outcome, CycleOutcome::SignalEmitted);
    assert_eq!(report.symbols_scanned, 2);
    assert_eq!(report.signals.len(), 1);

    let signal = &report.signals[0];
    assert_eq!(signal.symbol, "AAPL");
    assert_eq!(signal.direction, SignalDirection::Buy);
    assert!(signal.confidence >= 70.0);
    assert!(signal.stop_loss.unwrap() < signal.price);
    assert!(signal.take_profit.unwrap() > signal.price);

    let persisted = engine.get_signals(Some("AAPL"), 10).await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert!(engine.get_signals(Some("MSFT"), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn five_losses_trip_the_breaker_and_block_scans() {
    let store = Arc::new(MemoryStore::new());
    let (risk, engine) = scan_engine(store.clone(), &[("AAPL", oversold_capitulation())]).await;

    for i in 0..5 {
        let trade = Trade::open(
            format!("LOSS{}", i),
            "mean_reversion",
            Side::Long,
            Utc::now(),
            dec!(100),
            dec!(10),
            dec!(95),
            dec!(110),
        );
        let trade = risk.open_position(trade).await.unwrap();
        risk.close_position(trade.id, dec!(99), ExitReason::StopLoss).await.unwrap();
    }

    assert!(!risk.check_circuit_breakers("AAPL").await);
    assert!(risk.is_circuit_breaker_triggered());
    assert_eq!(risk.breaker_state().cause(), Some(BreakerCause::ConsecutiveLosses));
    assert!(!risk.can_open_position("AAPL").await);

    let report = engine.run_cycle().await;
    assert_eq!(report.symbols_scanned, 0);
    assert!(report.signals.is_empty());

    // Resetting alone re-trips on the same history; a win ends the streak
    risk.reset_circuit_breakers();
    assert!(!risk.can_open_position("AAPL").await);

    let mut win = Trade::open("WIN", "mean_reversion", Side::Long, Utc::now(), dec!(100), dec!(10), dec!(95), dec!(110));
    win.close(dec!(110), Utc::now(), ExitReason::TakeProfit);
    store.insert_trade(win).await.unwrap();
    risk.reset_circuit_breakers();
    assert!(risk.can_open_position("AAPL").await);
}

#[test]
fn no_entries_leave_capital_untouched() {
    let engine = BacktestEngine::new(BacktestConfig::default()).unwrap();
    let result = engine
        .run(&MeanReversionStrategy::default(), "FLAT", &quiet_market(250))
        .unwrap();

    assert_eq!(result.total_trades, 0);
    assert_eq!(result.win_rate, 0.0);
    assert_eq!(result.final_capital, result.initial_capital);
    assert_eq!(result.net_pnl, Decimal::ZERO);
}

/// Buys the second bar at its close with fixed levels.
struct BuySecondBar;

impl SignalStrategy for BuySecondBar {
    fn id(&self) -> &str {
        "buy_second_bar"
    }

    fn name(&self) -> &str {
        "Buy Second Bar"
    }

    fn warmup_period(&self) -> usize {
        2
    }

    fn exit_rules(&self) -> ExitRules {
        ExitRules::default()
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Option<Signal>, StrategyError> {
        match bars {
            [_, bar] => Ok(Some(
                Signal::new(symbol, self.id(), SignalDirection::Buy, 100.0, bar.close, bar.datetime())
                    .with_levels(90.0, 106.0),
            )),
            _ => Ok(None),
        }
    }
}

#[test]
fn single_winner_pays_commission_on_both_legs() {
    let config = BacktestConfig {
        commission_rate: dec!(0.0005),
        slippage_rate: Decimal::ZERO,
        ..BacktestConfig::default()
    };
    let engine = BacktestEngine::new(config).unwrap();
    let bars = from_closes(&[100.0, 100.0, 102.0, 106.0, 106.0, 106.0]);
    let result = engine.run(&BuySecondBar, "WIN", &bars).unwrap();

    assert_eq!(result.total_trades, 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, Some(ExitReason::TakeProfit));
    let q = trade.quantity;
    assert!(q > Decimal::ZERO);
    assert_eq!(result.net_pnl, dec!(6) * q - (dec!(100) + dec!(106)) * q * dec!(0.0005));
    assert_eq!(result.win_rate, 1.0);
}

#[test]
fn configured_strategies_replay_identically() {
    let config = load_config_with_overrides(None, &[]).unwrap();
    let strategies = StrategyRegistry::new().create_enabled(&config.strategies).unwrap();
    assert_eq!(strategies.len(), 4);

    let bars = SyntheticMarketData::new(2024).generate("SYN", Timeframe::Daily, 500);
    let engine = BacktestEngine::new(config.backtest.clone()).unwrap();
    for strategy in &strategies {
        let first = engine.run(strategy.as_ref(), "SYN", &bars).unwrap();
        let second = engine.run(strategy.as_ref(), "SYN", &bars).unwrap();
        assert_eq!(first, second, "{} is not deterministic", strategy.id());
        assert_eq!(first.equity_curve.len(), 500);
        assert!(first.trades.iter().all(|t| t.is_closed()));
    }
}

#[test]
fn disabled_strategies_are_not_built() {
    let mut disabled = StrategySettings::new("momentum_breakout");
    disabled.enabled = false;
    let settings = vec![StrategySettings::new("vwap_reversion"), disabled];

    let strategies = StrategyRegistry::new().create_enabled(&settings).unwrap();
    let ids: Vec<&str> = strategies.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["vwap_reversion"]);
}
