//! Stop-loss and take-profit levels.

use quant_core::types::Side;

/// ATR-based stop: below entry for longs, above for shorts.
pub fn calculate_stop_loss(entry_price: f64, atr: f64, side: Side, multiplier: f64) -> f64 {
    let offset = atr * multiplier;
    match side {
        Side::Long => entry_price - offset,
        Side::Short => entry_price + offset,
    }
}

/// Target `reward_risk` stop distances away from entry, on the profit side.
pub fn calculate_take_profit(entry_price: f64, stop_loss: f64, side: Side, reward_risk: f64) -> f64 {
    let distance = (entry_price - stop_loss).abs() * reward_risk;
    match side {
        Side::Long => entry_price + distance,
        Side::Short => entry_price - distance,
    }
}

/// Whether `price` has reached the stop.
pub fn is_stop_hit<T: PartialOrd>(stop: T, price: T, side: Side) -> bool {
    match side {
        Side::Long => price <= stop,
        Side::Short => price >= stop,
    }
}

/// Whether `price` has reached the target.
pub fn is_target_hit<T: PartialOrd>(target: T, price: T, side: Side) -> bool {
    match side {
        Side::Long => price >= target,
        Side::Short => price <= target,
    }
}

/// Ratchet an ATR trailing stop. The stop only moves in the trade's favour.
pub fn trail_stop(current_stop: f64, price: f64, atr: f64, side: Side, multiplier: f64) -> f64 {
    let candidate = calculate_stop_loss(price, atr, side, multiplier);
    match side {
        Side::Long => candidate.max(current_stop),
        Side::Short => candidate.min(current_stop),
    }
}
