//! Position sizing fractions.

/// Upper bound on any anti-martingale scaled fraction.
pub const ANTI_MARTINGALE_MAX_FRACTION: f64 = 0.05;

/// Kelly fraction `(b·p − q) / b` with `b = avg_win / avg_loss`, clamped to
/// `[0, cap]`.
///
/// Returns 0 for a zero or non-finite input, so a strategy with no wins, no
/// recorded losses or no edge is never allocated capital.
pub fn kelly_criterion(win_rate: f64, avg_win: f64, avg_loss: f64, cap: f64) -> f64 {
    if ![win_rate, avg_win, avg_loss, cap].iter().all(|v| v.is_finite()) {
        return 0.0;
    }
    if win_rate <= 0.0 || avg_win <= 0.0 || avg_loss <= 0.0 || cap <= 0.0 {
        return 0.0;
    }

    let p = win_rate.min(1.0);
    let q = 1.0 - p;
    let b = avg_win / avg_loss;
    let fraction = (b * p - q) / b;

    if fraction.is_finite() {
        fraction.clamp(0.0, cap)
    } else {
        0.0
    }
}

/// Scale `base` up after wins and down after losses.
///
/// Win streaks count at most three times; the result is capped at
/// [`ANTI_MARTINGALE_MAX_FRACTION`].
pub fn anti_martingale(
    base: f64,
    recent_wins: usize,
    recent_losses: usize,
    win_multiplier: f64,
    loss_multiplier: f64,
) -> f64 {
    let wins = recent_wins.min(3) as i32;
    let losses = i32::try_from(recent_losses).unwrap_or(i32::MAX);

    let scaled = base * win_multiplier.powi(wins) * loss_multiplier.powi(losses);
    if scaled.is_finite() {
        scaled.clamp(0.0, ANTI_MARTINGALE_MAX_FRACTION)
    } else {
        0.0
    }
}
