//! Aggregate risk metrics over trade history.

use chrono::{DateTime, Duration, Utc};
use num_traits::ToPrimitive;
use quant_core::types::Trade;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of account risk, recomputed on demand from trade history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Realized plus open unrealized PnL
    pub total_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub weekly_pnl: Decimal,
    /// Current distance below the equity peak, as a non-positive ratio
    pub current_drawdown: Decimal,
    /// Worst drawdown observed while replaying closed trades
    pub max_drawdown: Decimal,
    pub win_rate: Decimal,
    pub profit_factor: Decimal,
    pub sharpe_ratio: f64,
    pub closed_trades: usize,
    pub open_trades: usize,
    pub consecutive_losses: usize,
    pub is_circuit_breaker_triggered: bool,
}

impl RiskMetrics {
    /// Daily PnL as a ratio of `capital`.
    pub fn daily_pnl_ratio(&self, capital: Decimal) -> Option<Decimal> {
        self.daily_pnl.checked_div(capital)
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator.checked_div(denominator).unwrap_or_default()
    }
}

/// Compute metrics for `trades` against a starting `capital`.
///
/// Closed trades are replayed in exit order. Daily PnL covers trades closed
/// on `now`'s UTC date, weekly PnL the trailing seven days; both include
/// open unrealized PnL.
pub fn calculate_risk_metrics(trades: &[Trade], capital: Decimal, now: DateTime<Utc>) -> RiskMetrics {
    let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
    closed.sort_by_key(|t| t.exit_time);

    let open_unrealized: Decimal = trades
        .iter()
        .filter(|t| t.is_open())
        .map(|t| t.unrealized_pnl)
        .sum();
    let open_trades = trades.iter().filter(|t| t.is_open()).count();

    let pnls: Vec<Decimal> = closed.iter().map(|t| t.pnl()).collect();
    let realized: Decimal = pnls.iter().sum();

    let wins = pnls.iter().filter(|p| **p > Decimal::ZERO).count();
    let gross_profit: Decimal = pnls.iter().filter(|p| **p > Decimal::ZERO).sum();
    let gross_loss: Decimal = pnls
        .iter()
        .filter(|p| **p < Decimal::ZERO)
        .map(|p| p.abs())
        .sum();

    // Equity replay
    let mut equity = capital;
    let mut peak = capital;
    let mut max_drawdown = Decimal::ZERO;
    for pnl in &pnls {
        equity += *pnl;
        peak = peak.max(equity);
        if peak > Decimal::ZERO {
            max_drawdown = max_drawdown.min(ratio(equity - peak, peak));
        }
    }

    let marked_equity = equity + open_unrealized;
    let current_drawdown = if peak > Decimal::ZERO {
        ratio(marked_equity - peak, peak).min(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let today = now.date_naive();
    let week_start = now - Duration::days(7);
    let daily_pnl = closed
        .iter()
        .filter(|t| t.exit_time.is_some_and(|at| at.date_naive() == today))
        .map(|t| t.pnl())
        .sum::<Decimal>()
        + open_unrealized;
    let weekly_pnl = closed
        .iter()
        .filter(|t| t.exit_time.is_some_and(|at| at >= week_start))
        .map(|t| t.pnl())
        .sum::<Decimal>()
        + open_unrealized;

    RiskMetrics {
        total_pnl: realized + open_unrealized,
        daily_pnl,
        weekly_pnl,
        current_drawdown,
        max_drawdown,
        win_rate: ratio(Decimal::from(wins), Decimal::from(pnls.len())),
        profit_factor: ratio(gross_profit, gross_loss),
        sharpe_ratio: sharpe(&pnls),
        closed_trades: pnls.len(),
        open_trades,
        consecutive_losses: consecutive_losses(&pnls),
        is_circuit_breaker_triggered: false,
    }
}

/// Losing streak counted back from the most recent trade.
///
/// A win ends the streak; breakeven trades are skipped.
pub fn consecutive_losses(pnls: &[Decimal]) -> usize {
    let mut streak = 0;
    for pnl in pnls.iter().rev() {
        if *pnl < Decimal::ZERO {
            streak += 1;
        } else if *pnl > Decimal::ZERO {
            break;
        }
    }
    streak
}

/// Per-trade Sharpe ratio, mean over population standard deviation.
fn sharpe(pnls: &[Decimal]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }

    let values: Vec<f64> = pnls.iter().filter_map(|p| p.to_f64()).collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 && std_dev.is_finite() {
        mean / std_dev
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quant_core::types::{ExitReason, Side};
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn closed(pnl_per_share: Decimal, exit: DateTime<Utc>) -> Trade {
        let mut trade = Trade::open(
            "AAPL",
            "test",
            Side::Long,
            exit - Duration::hours(1),
            dec!(100),
            dec!(10),
            dec!(90),
            dec!(120),
        );
        trade.close(dec!(100) + pnl_per_share, exit, ExitReason::TakeProfit);
        trade
    }

    #[test]
    fn test_empty_history() {
        let metrics = calculate_risk_metrics(&[], dec!(100000), at(5, 12));
        assert_eq!(metrics.win_rate, Decimal::ZERO);
        assert_eq!(metrics.profit_factor, Decimal::ZERO);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, Decimal::ZERO);
    }

    #[test]
    fn test_win_rate_and_profit_factor() {
        let trades = vec![
            closed(dec!(10), at(1, 10)),
            closed(dec!(-5), at(2, 10)),
            closed(dec!(20), at(3, 10)),
            closed(dec!(-5), at(4, 10)),
        ];
        let metrics = calculate_risk_metrics(&trades, dec!(100000), at(5, 12));

        assert_eq!(metrics.closed_trades, 4);
        assert_eq!(metrics.win_rate, dec!(0.5));
        // 300 / 100
        assert_eq!(metrics.profit_factor, dec!(3));
        assert_eq!(metrics.total_pnl, dec!(200));
        // PnLs 100, -50, 200, -50: mean 50, population variance 45000 / 4
        assert!((metrics.sharpe_ratio - 50.0 / 11250f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_replay_in_exit_order() {
        // Inserted out of order; the peak is 101000 after the first win.
        let trades = vec![
            closed(dec!(-200), at(3, 10)),
            closed(dec!(100), at(1, 10)),
        ];
        let metrics = calculate_risk_metrics(&trades, dec!(100000), at(5, 12));

        // 100000 + 1000 = 101000 peak, then 99000
        let expected = dec!(-2000) / dec!(101000);
        assert_eq!(metrics.max_drawdown, expected);
        assert_eq!(metrics.current_drawdown, expected);
    }

    #[test]
    fn test_daily_and_weekly_windows() {
        let mut open = Trade::open(
            "MSFT",
            "test",
            Side::Long,
            at(5, 9),
            dec!(50),
            dec!(10),
            dec!(45),
            dec!(60),
        );
        open.mark(dec!(49));

        let trades = vec![
            closed(dec!(-10), at(5, 10)),
            closed(dec!(5), at(1, 10)),
            closed(dec!(3), Utc.with_ymd_and_hms(2024, 2, 20, 10, 0, 0).unwrap()),
            open,
        ];
        let now = at(5, 15);
        let metrics = calculate_risk_metrics(&trades, dec!(100000), now);

        assert_eq!(metrics.daily_pnl, dec!(-110));
        assert_eq!(metrics.weekly_pnl, dec!(-60));
        assert_eq!(metrics.open_trades, 1);
    }

    #[test]
    fn test_consecutive_losses_skip_breakeven() {
        let pnls = [dec!(5), dec!(-1), dec!(0), dec!(-2), dec!(-3)];
        assert_eq!(consecutive_losses(&pnls), 3);
        assert_eq!(consecutive_losses(&[dec!(-1), dec!(2)]), 0);
        assert_eq!(consecutive_losses(&[]), 0);
    }
}
