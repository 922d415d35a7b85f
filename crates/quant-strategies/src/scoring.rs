//! Point scoring shared by the strategies.
//!
//! Each rule adds points to the buy or sell side. A direction qualifies
//! when its raw score reaches the gate's threshold; confidence is the net
//! score (winning side minus the opposing side) capped at 100.

use quant_core::error::StrategyError;
use quant_core::traits::ExitRules;
use quant_core::types::{is_strictly_ordered, Bar, Signal, SignalDirection, Side};
use quant_risk::{calculate_stop_loss, calculate_take_profit};
use serde::{Deserialize, Serialize};

/// Thresholds a score card must clear to emit a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalGate {
    /// Minimum raw score for a direction
    pub direction_threshold: f64,
    /// Minimum net confidence, 0-100
    pub min_confidence: f64,
}

impl Default for SignalGate {
    fn default() -> Self {
        Self {
            direction_threshold: 60.0,
            min_confidence: 70.0,
        }
    }
}

impl SignalGate {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(StrategyError::InvalidConfig(
                "min_confidence must be between 0 and 100".into(),
            ));
        }
        if !(self.direction_threshold > 0.0) {
            return Err(StrategyError::InvalidConfig(
                "direction_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreCard {
    buy: f64,
    sell: f64,
    reasons: Vec<String>,
    indicators: Vec<(String, f64)>,
}

impl ScoreCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buy(&mut self, points: f64, reason: impl Into<String>) {
        self.buy += points;
        self.reasons.push(reason.into());
    }

    pub fn sell(&mut self, points: f64, reason: impl Into<String>) {
        self.sell += points;
        self.reasons.push(reason.into());
    }

    /// Credit a direction-neutral confirmation (volume) to the leading side.
    pub fn confirm(&mut self, points: f64, reason: impl Into<String>) {
        if self.buy > self.sell {
            self.buy(points, reason);
        } else if self.sell > self.buy {
            self.sell(points, reason);
        }
    }

    /// Record an indicator value in the signal snapshot.
    pub fn record(&mut self, name: &str, value: f64) {
        if value.is_finite() {
            self.indicators.push((name.to_string(), value));
        }
    }

    pub fn buy_score(&self) -> f64 {
        self.buy
    }

    pub fn sell_score(&self) -> f64 {
        self.sell
    }

    /// Winning direction and its confidence, if the gate is cleared.
    pub fn decide(&self, gate: &SignalGate) -> Option<(SignalDirection, f64)> {
        let (direction, score, opposing) = if self.buy > self.sell {
            (SignalDirection::Buy, self.buy, self.sell)
        } else if self.sell > self.buy {
            (SignalDirection::Sell, self.sell, self.buy)
        } else {
            return None;
        };

        let confidence = (score - opposing.max(0.0)).clamp(0.0, 100.0);
        (score >= gate.direction_threshold && confidence >= gate.min_confidence)
            .then_some((direction, confidence))
    }

    /// Turn a qualifying score card into a signal for the last bar.
    ///
    /// Stop and target come from `atr` and the strategy's exit rules.
    pub fn into_signal(
        self,
        strategy_id: &str,
        symbol: &str,
        bar: &Bar,
        atr: f64,
        exit: &ExitRules,
        gate: &SignalGate,
    ) -> Option<Signal> {
        let (direction, confidence) = self.decide(gate)?;
        let side = direction.side()?;

        let stop = calculate_stop_loss(bar.close, atr, side, exit.stop_atr_multiplier);
        let target = calculate_take_profit(bar.close, stop, side, exit.reward_risk_ratio);
        let (stop, target) = match side {
            Side::Long => (stop.max(0.0), target),
            Side::Short => (stop, target.max(0.0)),
        };

        let mut signal = Signal::new(symbol, strategy_id, direction, confidence, bar.close, bar.datetime())
            .with_levels(stop, target)
            .with_reason(self.reasons.join("; "));
        for (name, value) in self.indicators {
            signal = signal.with_indicator(name, value);
        }
        Some(signal)
    }
}

/// Reject windows that are not strictly time-ordered.
pub(crate) fn check_window(bars: &[Bar]) -> Result<(), StrategyError> {
    if is_strictly_ordered(bars) {
        Ok(())
    } else {
        Err(StrategyError::Evaluation(
            "bars must be strictly ordered by timestamp".into(),
        ))
    }
}

/// Missing indicator output despite a full warm-up window.
pub(crate) fn missing(name: &str) -> StrategyError {
    StrategyError::Evaluation(format!("{} produced no value", name))
}
