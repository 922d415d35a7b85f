//! Circuit breaker rules.

use chrono::{DateTime, Utc};
use quant_core::types::BreakerCause;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{RiskLimits, RiskMetrics};

/// Breaker state broadcast to scans and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BreakerState {
    #[default]
    Armed,
    Tripped {
        cause: BreakerCause,
        at: DateTime<Utc>,
    },
}

impl BreakerState {
    pub fn is_tripped(&self) -> bool {
        matches!(self, BreakerState::Tripped { .. })
    }

    pub fn cause(&self) -> Option<BreakerCause> {
        match self {
            BreakerState::Armed => None,
            BreakerState::Tripped { cause, .. } => Some(*cause),
        }
    }
}

/// First breaker rule `metrics` violates, if any.
///
/// Loss, drawdown and streak checks are inclusive of the limit. The
/// win-rate rule only applies once more than `min_trades_for_win_rate`
/// trades have closed.
pub fn evaluate_breakers(
    metrics: &RiskMetrics,
    limits: &RiskLimits,
    capital: Decimal,
) -> Option<BreakerCause> {
    if capital > Decimal::ZERO {
        if let Some(daily) = metrics.daily_pnl_ratio(capital) {
            if daily <= limits.max_daily_loss {
                return Some(BreakerCause::DailyLoss);
            }
        }
    }

    if metrics.current_drawdown <= limits.max_total_drawdown {
        return Some(BreakerCause::MaxDrawdown);
    }

    if metrics.consecutive_losses >= limits.max_consecutive_losses {
        return Some(BreakerCause::ConsecutiveLosses);
    }

    if metrics.closed_trades > limits.min_trades_for_win_rate && metrics.win_rate < limits.min_win_rate {
        return Some(BreakerCause::LowWinRate);
    }

    None
}
