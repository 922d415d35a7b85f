//! Trading signals emitted by strategy evaluators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::Side;

/// Direction a strategy recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    Buy,
    Sell,
    Hold,
}

impl SignalDirection {
    /// Position side opened by this direction, `None` for hold.
    pub fn side(&self) -> Option<Side> {
        match self {
            SignalDirection::Buy => Some(Side::Long),
            SignalDirection::Sell => Some(Side::Short),
            SignalDirection::Hold => None,
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalDirection::Buy => "buy",
            SignalDirection::Sell => "sell",
            SignalDirection::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// A scored trade recommendation.
///
/// Signals are append-only: once persisted only `processed` and `trade_id`
/// change, when a downstream consumer acts on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub symbol: String,
    pub direction: SignalDirection,
    pub strategy_id: String,
    /// Confidence in percent, 0-100.
    pub confidence: f64,
    /// Reference price (close of the evaluated bar).
    pub price: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    /// Indicator snapshot at evaluation time.
    pub indicators: BTreeMap<String, f64>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    pub trade_id: Option<Uuid>,
}

impl Signal {
    /// Build an unprocessed signal. Confidence is clamped to [0, 100].
    pub fn new(
        symbol: impl Into<String>,
        strategy_id: impl Into<String>,
        direction: SignalDirection,
        confidence: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            direction,
            strategy_id: strategy_id.into(),
            confidence,
            price,
            take_profit: None,
            stop_loss: None,
            indicators: BTreeMap::new(),
            reason: String::new(),
            timestamp,
            processed: false,
            trade_id: None,
        }
    }

    pub fn with_levels(mut self, stop_loss: f64, take_profit: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Whether the signal recommends opening a position.
    pub fn is_actionable(&self) -> bool {
        self.direction != SignalDirection::Hold
    }
}
