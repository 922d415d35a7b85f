//! Strategy trait definitions.

use serde::{Deserialize, Serialize};

use crate::error::StrategyError;
use crate::types::{Bar, Signal};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    fn validate(&self) -> Result<(), StrategyError>;
}

/// How positions opened from a strategy's signals are protected and sized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    /// Stop distance in ATR multiples.
    pub stop_atr_multiplier: f64,
    /// Take-profit distance as a multiple of the stop distance.
    pub reward_risk_ratio: f64,
    /// Bars after which an open position is closed regardless of price.
    pub max_holding_bars: usize,
    /// Ceiling on the fraction of capital committed to one position.
    pub max_position_fraction: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            stop_atr_multiplier: 2.0,
            reward_risk_ratio: 2.0,
            max_holding_bars: 10,
            max_position_fraction: 0.05,
        }
    }
}

impl ExitRules {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.stop_atr_multiplier > 0.0) {
            return Err(StrategyError::InvalidConfig(
                "stop ATR multiplier must be positive".into(),
            ));
        }
        if !(self.reward_risk_ratio > 0.0) {
            return Err(StrategyError::InvalidConfig(
                "reward/risk ratio must be positive".into(),
            ));
        }
        if self.max_holding_bars == 0 {
            return Err(StrategyError::InvalidConfig(
                "max holding period must be at least one bar".into(),
            ));
        }
        if !(self.max_position_fraction > 0.0 && self.max_position_fraction <= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "max position fraction must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Score-based signal evaluator.
///
/// Evaluation is a pure function of the bar window: implementations hold
/// only immutable configuration, so one instance can be shared across
/// scans and parallel backtests.
pub trait SignalStrategy: Send + Sync {
    /// Stable identifier used in configuration and persisted signals.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Bars required before the strategy can score.
    fn warmup_period(&self) -> usize;

    fn exit_rules(&self) -> ExitRules;

    /// Score the latest bar of `bars` (oldest first).
    ///
    /// Returns `Ok(None)` when the window is shorter than the warm-up or
    /// the score does not clear the strategy's thresholds.
    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<Option<Signal>, StrategyError>;

    fn is_warmed_up(&self, bars_available: usize) -> bool {
        bars_available >= self.warmup_period()
    }
}
