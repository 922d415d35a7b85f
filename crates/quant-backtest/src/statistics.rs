//! Backtest statistics.

use quant_core::types::Trade;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Win/loss aggregates over closed trades.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub gross_profit: Decimal,
    /// Sum of losing PnL, as a positive amount
    pub gross_loss: Decimal,
    pub net_pnl: Decimal,
    /// Wins over all closed trades, 0-1
    pub win_rate: f64,
    /// Gross profit over gross loss; 0 when there are no losses
    pub profit_factor: f64,
    pub avg_win: Decimal,
    /// Average losing PnL, as a positive amount
    pub avg_loss: Decimal,
    /// Net PnL per trade
    pub expectancy: Decimal,
    /// Wins at the end of the trade list
    pub win_streak: usize,
    /// Losses at the end of the trade list
    pub loss_streak: usize,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut stats = Self::default();

        for pnl in trades.iter().filter(|t| t.is_closed()).map(|t| t.pnl()) {
            stats.total_trades += 1;
            stats.net_pnl += pnl;
            if pnl > Decimal::ZERO {
                stats.winning_trades += 1;
                stats.gross_profit += pnl;
                stats.win_streak += 1;
                stats.loss_streak = 0;
            } else if pnl < Decimal::ZERO {
                stats.losing_trades += 1;
                stats.gross_loss += pnl.abs();
                stats.loss_streak += 1;
                stats.win_streak = 0;
            }
        }

        if stats.total_trades > 0 {
            stats.win_rate = stats.winning_trades as f64 / stats.total_trades as f64;
            stats.expectancy = stats.net_pnl / Decimal::from(stats.total_trades);
        }
        if stats.winning_trades > 0 {
            stats.avg_win = stats.gross_profit / Decimal::from(stats.winning_trades);
        }
        if stats.losing_trades > 0 {
            stats.avg_loss = stats.gross_loss / Decimal::from(stats.losing_trades);
        }
        if stats.gross_loss > Decimal::ZERO {
            stats.profit_factor = to_f64(stats.gross_profit / stats.gross_loss);
        }
        stats
    }
}

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Simple returns between consecutive capital snapshots.
pub fn periodic_returns(snapshots: &[Decimal]) -> Vec<f64> {
    snapshots
        .windows(2)
        .filter(|w| w[0] > Decimal::ZERO)
        .map(|w| to_f64((w[1] - w[0]) / w[0]))
        .collect()
}

/// `(1 + total)^(periods_per_year / bars) - 1`.
pub fn annualized_return(total_return: f64, bars: usize, periods_per_year: f64) -> f64 {
    if bars == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    let annualized = growth.powf(periods_per_year / bars as f64) - 1.0;
    if annualized.is_finite() {
        annualized
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Annualized Sharpe ratio (risk-free rate 0) of a return series sampled
/// `periods_per_year` times a year.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(returns);
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean * periods_per_year.sqrt() / std_dev
    } else {
        0.0
    }
}

/// Like [`sharpe_ratio`] but penalising only negative returns.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let negative: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if negative.is_empty() {
        return 0.0;
    }
    let downside = (negative.iter().map(|r| r.powi(2)).sum::<f64>() / negative.len() as f64).sqrt();

    if downside > 0.0 {
        mean(returns) * periods_per_year.sqrt() / downside
    } else {
        0.0
    }
}

/// Annualized return over the absolute max drawdown; 0 without drawdown.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown.abs() > 0.0 {
        annualized_return / max_drawdown.abs()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use quant_core::types::{ExitReason, Side};
    use rust_decimal_macros::dec;

    fn closed(entry: Decimal, exit: Decimal) -> Trade {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut trade = Trade::open("T", "test", Side::Long, at, entry, dec!(1), dec!(0), dec!(1000));
        trade.close(exit, at, ExitReason::TakeProfit);
        trade
    }

    #[test]
    fn test_trade_stats() {
        let trades = vec![
            closed(dec!(100), dec!(110)),
            closed(dec!(100), dec!(95)),
            closed(dec!(100), dec!(100)),
            closed(dec!(100), dec!(120)),
        ];
        let stats = TradeStats::from_trades(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.avg_win, dec!(15));
        assert_eq!(stats.avg_loss, dec!(5));
        assert_eq!(stats.profit_factor, 6.0);
        assert_eq!(stats.expectancy, dec!(6.25));
        assert_eq!(stats.win_streak, 1);
        assert_eq!(stats.loss_streak, 0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = TradeStats::from_trades(&[]);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.expectancy, Decimal::ZERO);
    }

    #[test]
    fn test_periodic_returns() {
        let returns = periodic_returns(&[dec!(100), dec!(110), dec!(99)]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.10).abs() < 1e-12);
        assert!((returns[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_annualized_return() {
        assert!((annualized_return(0.10, 252, 252.0) - 0.10).abs() < 1e-12);
        assert!((annualized_return(0.21, 504, 252.0) - 0.10).abs() < 1e-12);
        assert_eq!(annualized_return(0.5, 0, 252.0), 0.0);
        assert_eq!(annualized_return(-1.5, 100, 252.0), -1.0);
    }

    #[test]
    fn test_ratios() {
        let flat = [0.25, 0.25, 0.25];
        assert_eq!(sharpe_ratio(&flat, 12.0), 0.0);
        assert_eq!(sortino_ratio(&flat, 12.0), 0.0);

        let mixed = [0.02, -0.01, 0.03, -0.02];
        assert!(sharpe_ratio(&mixed, 12.0) > 0.0);
        assert!(sortino_ratio(&mixed, 12.0) > 0.0);

        assert_eq!(calmar_ratio(0.2, -0.1), 2.0);
        assert_eq!(calmar_ratio(0.2, 0.0), 0.0);
    }
}
