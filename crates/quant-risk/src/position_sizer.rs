//! Confidence-scaled Kelly position sizing.

use num_traits::{FromPrimitive, ToPrimitive};
use quant_core::types::Signal;
use quant_indicators::kelly_criterion;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::RiskLimits;

/// Smallest fraction of the balance allocated to an accepted signal.
pub const MIN_POSITION_FRACTION: f64 = 0.005;

/// Fraction of the balance used when sizing cannot be computed.
pub const FALLBACK_POSITION_FRACTION: Decimal = dec!(0.01);

fn sized_fraction(
    signal: &Signal,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    limits: &RiskLimits,
) -> Option<Decimal> {
    let max_fraction = limits.max_position_size.to_f64()?;
    if !signal.confidence.is_finite() || !(max_fraction > 0.0) {
        return None;
    }

    let kelly = kelly_criterion(win_rate, avg_win, avg_loss, max_fraction);
    let fraction = (kelly * signal.confidence / 100.0)
        .max(MIN_POSITION_FRACTION)
        .min(max_fraction);

    if fraction.is_finite() {
        Decimal::from_f64(fraction).map(|f| f.round_dp(6))
    } else {
        None
    }
}

/// Monetary position value for `signal`.
///
/// Kelly fraction times `confidence / 100`, clamped to
/// `[MIN_POSITION_FRACTION, max_position_size]`, times `balance`. Falls back
/// to 1% of the balance when any step yields a non-finite or
/// unrepresentable value.
pub fn validate_position_size(
    signal: &Signal,
    balance: Decimal,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    limits: &RiskLimits,
) -> Decimal {
    match sized_fraction(signal, win_rate, avg_win, avg_loss, limits) {
        Some(fraction) => balance * fraction,
        None => {
            warn!(
                "Position sizing failed for {} ({}), using fallback fraction",
                signal.symbol, signal.strategy_id
            );
            balance * FALLBACK_POSITION_FRACTION
        }
    }
}
