//! Account-level risk limits.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::RiskError;

/// Thresholds the circuit breakers and the entry gate enforce.
///
/// Loss and drawdown limits are negative ratios of account capital, so a
/// limit of `-0.02` trips once the day is down 2% or more. Values are
/// immutable once shared; changes go through the `with_*` builders and are
/// swapped in whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Daily PnL over capital at or below which trading halts
    pub max_daily_loss: Decimal,
    /// Drawdown from the equity peak at or below which trading halts
    pub max_total_drawdown: Decimal,
    /// Largest fraction of capital committed to one position
    pub max_position_size: Decimal,
    pub max_open_positions: usize,
    /// Win rate under which trading halts once enough trades have closed
    pub min_win_rate: Decimal,
    pub max_consecutive_losses: usize,
    /// Closed trades required before the win-rate breaker is armed
    pub min_trades_for_win_rate: usize,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_daily_loss: dec!(-0.02),
            max_total_drawdown: dec!(-0.10),
            max_position_size: dec!(0.05),
            max_open_positions: 5,
            min_win_rate: dec!(0.40),
            max_consecutive_losses: 5,
            min_trades_for_win_rate: 20,
        }
    }
}

impl RiskLimits {
    pub fn with_max_daily_loss(mut self, ratio: Decimal) -> Self {
        self.max_daily_loss = ratio;
        self
    }

    pub fn with_max_total_drawdown(mut self, ratio: Decimal) -> Self {
        self.max_total_drawdown = ratio;
        self
    }

    pub fn with_max_position_size(mut self, fraction: Decimal) -> Self {
        self.max_position_size = fraction;
        self
    }

    pub fn with_max_open_positions(mut self, count: usize) -> Self {
        self.max_open_positions = count;
        self
    }

    pub fn with_min_win_rate(mut self, rate: Decimal) -> Self {
        self.min_win_rate = rate;
        self
    }

    pub fn with_max_consecutive_losses(mut self, count: usize) -> Self {
        self.max_consecutive_losses = count;
        self
    }

    pub fn with_min_trades_for_win_rate(mut self, count: usize) -> Self {
        self.min_trades_for_win_rate = count;
        self
    }

    pub fn validate(&self) -> Result<(), RiskError> {
        if self.max_daily_loss >= Decimal::ZERO {
            return Err(RiskError::InvalidLimits(format!(
                "max_daily_loss must be negative, got {}",
                self.max_daily_loss
            )));
        }
        if self.max_total_drawdown >= Decimal::ZERO || self.max_total_drawdown <= Decimal::NEGATIVE_ONE {
            return Err(RiskError::InvalidLimits(format!(
                "max_total_drawdown must be in (-1, 0), got {}",
                self.max_total_drawdown
            )));
        }
        if self.max_position_size <= Decimal::ZERO || self.max_position_size > Decimal::ONE {
            return Err(RiskError::InvalidLimits(format!(
                "max_position_size must be in (0, 1], got {}",
                self.max_position_size
            )));
        }
        if self.max_open_positions == 0 {
            return Err(RiskError::InvalidLimits(
                "max_open_positions must be at least 1".into(),
            ));
        }
        if self.min_win_rate < Decimal::ZERO || self.min_win_rate > Decimal::ONE {
            return Err(RiskError::InvalidLimits(format!(
                "min_win_rate must be in [0, 1], got {}",
                self.min_win_rate
            )));
        }
        if self.max_consecutive_losses == 0 {
            return Err(RiskError::InvalidLimits(
                "max_consecutive_losses must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let limits = RiskLimits::default();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.min_trades_for_win_rate, 20);
    }

    #[test]
    fn test_builders_produce_new_value() {
        let base = RiskLimits::default();
        let tightened = base
            .clone()
            .with_max_daily_loss(dec!(-0.01))
            .with_max_open_positions(2);

        assert_eq!(base.max_daily_loss, dec!(-0.02));
        assert_eq!(tightened.max_daily_loss, dec!(-0.01));
        assert_eq!(tightened.max_open_positions, 2);
    }

    #[test]
    fn test_rejects_positive_loss_limit() {
        let limits = RiskLimits::default().with_max_daily_loss(dec!(0.02));
        assert!(matches!(limits.validate(), Err(RiskError::InvalidLimits(_))));

        let limits = RiskLimits::default().with_max_position_size(dec!(1.5));
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let limits: RiskLimits =
            serde_json::from_str(r#"{"max_open_positions": 3, "max_daily_loss": "-0.03"}"#)
                .unwrap();
        assert_eq!(limits.max_open_positions, 3);
        assert_eq!(limits.max_daily_loss, dec!(-0.03));
        assert_eq!(limits.max_consecutive_losses, 5);
    }
}
