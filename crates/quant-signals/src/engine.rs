//! Signal scan cycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quant_core::error::StoreError;
use quant_core::traits::{MarketDataProvider, SignalStore, SignalStrategy};
use quant_core::types::{Signal, Timeframe};
use quant_risk::{BreakerState, RiskManager};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::{EngineError, MarketHours};

/// Scan universe and cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    /// Bars fetched per symbol and handed to each strategy
    pub lookback_bars: usize,
    pub scan_interval_secs: u64,
    pub market_hours: MarketHours,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: ["SPY", "QQQ", "AAPL", "MSFT", "NVDA"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeframe: Timeframe::Daily,
            lookback_bars: 200,
            scan_interval_secs: 30,
            market_hours: MarketHours::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(EngineError::InvalidConfig("symbols must not be blank".into()));
        }
        if self.lookback_bars == 0 {
            return Err(EngineError::InvalidConfig("lookback_bars must be positive".into()));
        }
        if self.scan_interval_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "scan_interval_secs must be positive".into(),
            ));
        }
        self.market_hours.validate()
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Scanning,
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    SignalEmitted,
    NoSignal,
    /// Another cycle held the scan guard.
    Skipped,
    /// Outside market hours.
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub symbols_scanned: usize,
    /// Symbols skipped because the breakers were tripped
    pub symbols_blocked: usize,
    /// Data, strategy and persistence failures
    pub errors: usize,
    /// The scan stopped early on a breaker trip
    pub aborted: bool,
    /// Signals persisted this cycle
    pub signals: Vec<Signal>,
}

impl ScanReport {
    fn new(started_at: DateTime<Utc>, outcome: CycleOutcome) -> Self {
        Self {
            started_at,
            outcome,
            symbols_scanned: 0,
            symbols_blocked: 0,
            errors: 0,
            aborted: false,
            signals: Vec::new(),
        }
    }
}

/// True once a trip not yet seen by this scan arrives on `breaker`.
fn tripped_since_seen(breaker: &mut watch::Receiver<BreakerState>) -> bool {
    breaker.has_changed().unwrap_or(false) && breaker.borrow_and_update().is_tripped()
}

/// Last emitted bar per (symbol, strategy).
type EmittedBars = HashMap<(String, String), DateTime<Utc>>;

/// Scans the symbol universe with every strategy, behind the risk gate.
///
/// One cycle runs at a time. The cycle guard also holds the last bar each
/// strategy signalled on, so a bar is never signalled twice.
pub struct SignalEngine {
    config: watch::Sender<Arc<EngineConfig>>,
    risk: Arc<RiskManager>,
    strategies: Vec<Arc<dyn SignalStrategy>>,
    market_data: Arc<dyn MarketDataProvider>,
    signals: Arc<dyn SignalStore>,
    scan_guard: Mutex<EmittedBars>,
    phase: watch::Sender<ScanPhase>,
}

impl SignalEngine {
    pub fn new(
        config: EngineConfig,
        risk: Arc<RiskManager>,
        strategies: Vec<Arc<dyn SignalStrategy>>,
        market_data: Arc<dyn MarketDataProvider>,
        signals: Arc<dyn SignalStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if strategies.is_empty() {
            return Err(EngineError::InvalidConfig("at least one strategy is required".into()));
        }

        let (config, _) = watch::channel(Arc::new(config));
        let (phase, _) = watch::channel(ScanPhase::Idle);
        Ok(Self {
            config,
            risk,
            strategies,
            market_data,
            signals,
            scan_guard: Mutex::new(HashMap::new()),
            phase,
        })
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.borrow().clone()
    }

    /// Swap the configuration; a running cycle finishes with the old one.
    pub fn replace_config(&self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        info!(
            "Engine config replaced: {} symbols every {}s",
            config.symbols.len(),
            config.scan_interval_secs
        );
        self.config.send_replace(Arc::new(config));
        Ok(())
    }

    pub fn phase(&self) -> ScanPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    pub fn strategies(&self) -> &[Arc<dyn SignalStrategy>] {
        &self.strategies
    }

    pub fn risk(&self) -> &Arc<RiskManager> {
        &self.risk
    }

    /// Persisted signals, newest first.
    pub async fn get_signals(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<Signal>, StoreError> {
        self.signals.signals(symbol, limit).await
    }

    pub async fn run_cycle(&self) -> ScanReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one scan as of `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> ScanReport {
        let Ok(mut emitted) = self.scan_guard.try_lock() else {
            debug!("Scan already in progress, skipping tick");
            return ScanReport::new(now, CycleOutcome::Skipped);
        };

        let config = self.config();
        if !config.market_hours.is_open(now) {
            debug!("Market closed at {}, skipping scan", now);
            return ScanReport::new(now, CycleOutcome::Closed);
        }

        self.phase.send_replace(ScanPhase::Scanning);
        let mut report = ScanReport::new(now, CycleOutcome::NoSignal);
        // A fresh receiver has already seen the current state
        let mut breaker = self.risk.breaker_watch();

        'symbols: for symbol in &config.symbols {
            if tripped_since_seen(&mut breaker) {
                warn!("Circuit breaker tripped mid-scan, aborting before {}", symbol);
                report.aborted = true;
                break;
            }

            if !self.risk.check_circuit_breakers_at(symbol, now).await {
                debug!("Breakers blocked {}", symbol);
                report.symbols_blocked += 1;
                continue;
            }

            let bars = match self
                .market_data
                .bars(symbol, config.timeframe, config.lookback_bars)
                .await
            {
                Ok(bars) => bars,
                Err(e) => {
                    warn!("Skipping {}: failed to load bars from {}: {}", symbol, self.market_data.name(), e);
                    report.errors += 1;
                    continue;
                }
            };
            if tripped_since_seen(&mut breaker) {
                warn!("Circuit breaker tripped while loading {}, aborting scan", symbol);
                report.aborted = true;
                break;
            }
            report.symbols_scanned += 1;

            for strategy in &self.strategies {
                let signal = match strategy.evaluate(symbol, &bars) {
                    Ok(Some(signal)) if signal.is_actionable() => signal,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Strategy {} failed on {}: {}", strategy.id(), symbol, e);
                        report.errors += 1;
                        continue;
                    }
                };

                let key = (symbol.clone(), strategy.id().to_string());
                if emitted.get(&key) == Some(&signal.timestamp) {
                    debug!("{} already signalled {} at {}", strategy.id(), symbol, signal.timestamp);
                    continue;
                }

                if tripped_since_seen(&mut breaker) {
                    warn!("Circuit breaker tripped, dropping {} signal on {}", strategy.id(), symbol);
                    report.aborted = true;
                    break 'symbols;
                }

                match self.signals.insert_signal(signal.clone()).await {
                    Ok(()) => {
                        info!(
                            "Signal {:?} {} from {} at {:.2} (confidence {:.0})",
                            signal.direction,
                            symbol,
                            strategy.id(),
                            signal.price,
                            signal.confidence
                        );
                        emitted.insert(key, signal.timestamp);
                        report.signals.push(signal);
                    }
                    Err(e) => {
                        error!("Failed to persist signal for {} from {}: {}", symbol, strategy.id(), e);
                        report.errors += 1;
                    }
                }
            }
        }

        if !report.signals.is_empty() {
            report.outcome = CycleOutcome::SignalEmitted;
        }
        info!(
            "Scan finished: {} scanned, {} blocked, {} signals, {} errors{}",
            report.symbols_scanned,
            report.symbols_blocked,
            report.signals.len(),
            report.errors,
            if report.aborted { " (aborted)" } else { "" }
        );
        self.phase.send_replace(ScanPhase::Idle);
        report
    }
}
