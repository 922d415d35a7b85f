//! Backtesting engine.

use chrono::{DateTime, Utc};
use quant_core::traits::{BarIndicator, SignalStrategy};
use quant_core::types::{is_strictly_ordered, Bar, ExitReason, Side, Trade};
use quant_indicators::{anti_martingale, kelly_criterion, Atr};
use quant_risk::{is_stop_hit, is_target_hit, trail_stop};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::statistics::{
    annualized_return, calmar_ratio, periodic_returns, sharpe_ratio, sortino_ratio, to_f64, TradeStats,
};
use crate::BacktestError;

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    /// Commission as a fraction of notional, charged on each leg
    pub commission_rate: Decimal,
    /// Adverse price adjustment as a fraction of price, on each fill
    pub slippage_rate: Decimal,
    /// Tax as a fraction of gross profit on winning trades
    pub tax_rate: Decimal,
    pub max_open_positions: usize,
    /// Quantities are rounded down to a multiple of this
    pub lot_size: Decimal,
    pub allow_short: bool,
    /// Kelly inputs used until `min_trades_for_kelly` trades have closed
    pub prior_win_rate: f64,
    pub prior_avg_win: f64,
    pub prior_avg_loss: f64,
    pub min_trades_for_kelly: usize,
    pub use_anti_martingale: bool,
    pub anti_martingale_win_multiplier: f64,
    pub anti_martingale_loss_multiplier: f64,
    /// Bars between capital snapshots for the return series
    pub return_period_bars: usize,
    pub periods_per_year: f64,
    /// Trailing bars handed to the strategy; raised to its warm-up if shorter
    pub lookback: usize,
    /// ATR period for trailing stops; stops stay fixed when unset
    pub trailing_stop_atr_period: Option<usize>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            commission_rate: dec!(0.0005),
            slippage_rate: dec!(0.0005),
            tax_rate: Decimal::ZERO,
            max_open_positions: 1,
            lot_size: Decimal::ONE,
            allow_short: true,
            prior_win_rate: 0.55,
            prior_avg_win: 1.5,
            prior_avg_loss: 1.0,
            min_trades_for_kelly: 10,
            use_anti_martingale: false,
            anti_martingale_win_multiplier: 1.25,
            anti_martingale_loss_multiplier: 0.75,
            return_period_bars: 21,
            periods_per_year: 252.0,
            lookback: 200,
            trailing_stop_atr_period: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig("initial capital must be positive".into()));
        }
        for (name, rate) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
            ("tax_rate", self.tax_rate),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(BacktestError::InvalidConfig(format!("{} must be in [0, 1)", name)));
            }
        }
        if self.max_open_positions == 0 {
            return Err(BacktestError::InvalidConfig("max_open_positions must be positive".into()));
        }
        if self.lot_size <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig("lot_size must be positive".into()));
        }
        if self.trailing_stop_atr_period == Some(0) {
            return Err(BacktestError::InvalidConfig("trailing_stop_atr_period must be positive".into()));
        }
        if self.return_period_bars == 0 || !(self.periods_per_year > 0.0) {
            return Err(BacktestError::InvalidConfig(
                "return period and periods per year must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Capital at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub capital: Decimal,
}

/// Outcome of one strategy over one symbol's bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_id: String,
    pub symbol: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bars: usize,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub net_pnl: Decimal,
    pub total_return: f64,
    pub annualized_return: f64,
    /// Largest peak-to-trough decline of the equity curve, as a negative ratio
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub expectancy: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    /// Kelly fraction implied by the final trade statistics, uncapped
    pub kelly_fraction: f64,
    pub total_commission: Decimal,
    pub total_slippage: Decimal,
    pub total_tax: Decimal,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

struct Position {
    trade: Trade,
    entry_bar: usize,
    max_holding_bars: usize,
}

impl Position {
    /// Collateral plus open PnL at `price`.
    fn value_at(&self, price: Decimal) -> Decimal {
        self.trade.notional() + self.trade.gross_pnl_at(price)
    }
}

/// Running state of one replay.
struct Ledger<'a> {
    config: &'a BacktestConfig,
    cash: Decimal,
    open: Vec<Position>,
    closed: Vec<Trade>,
    next_id: u128,
    commission: Decimal,
    slippage: Decimal,
    tax: Decimal,
}

impl<'a> Ledger<'a> {
    fn new(config: &'a BacktestConfig) -> Self {
        Self {
            config,
            cash: config.initial_capital,
            open: Vec::new(),
            closed: Vec::new(),
            next_id: 1,
            commission: Decimal::ZERO,
            slippage: Decimal::ZERO,
            tax: Decimal::ZERO,
        }
    }

    fn equity(&self, price: Decimal) -> Decimal {
        self.cash + self.open.iter().map(|p| p.value_at(price)).sum::<Decimal>()
    }

    /// Fill price after slippage for a buy (`adverse_up`) or a sell.
    fn slipped(&self, price: Decimal, adverse_up: bool) -> Decimal {
        let adjustment = price * self.config.slippage_rate;
        if adverse_up {
            price + adjustment
        } else {
            price - adjustment
        }
    }

    fn open_position(&mut self, mut trade: Trade, reference: Decimal, entry_bar: usize, max_holding_bars: usize) {
        let commission = trade.notional() * self.config.commission_rate;
        trade.fees = commission;
        trade = trade.with_id(Uuid::from_u128(self.next_id));
        self.next_id += 1;

        self.cash -= trade.notional() + commission;
        self.commission += commission;
        self.slippage += (trade.entry_price - reference).abs() * trade.quantity;

        debug!(
            "Opened {:?} {} {} @ {} (stop {}, target {})",
            trade.side, trade.quantity, trade.symbol, trade.entry_price, trade.stop_loss, trade.take_profit
        );
        self.open.push(Position {
            trade,
            entry_bar,
            max_holding_bars,
        });
    }

    fn close_position(&mut self, index: usize, reference: Decimal, at: DateTime<Utc>, reason: ExitReason) {
        let mut position = self.open.swap_remove(index);
        let trade = &mut position.trade;

        let fill = self.slipped(reference, trade.side == Side::Short);
        let commission = fill * trade.quantity * self.config.commission_rate;
        let gross = trade.gross_pnl_at(fill);
        let tax = if gross > Decimal::ZERO {
            gross * self.config.tax_rate
        } else {
            Decimal::ZERO
        };

        trade.fees += commission;
        trade.taxes = tax;
        trade.close(fill, at, reason);

        self.cash += trade.notional() + gross - commission - tax;
        self.commission += commission;
        self.tax += tax;
        self.slippage += (fill - reference).abs() * trade.quantity;

        debug!("Closed {} @ {} ({}), pnl {}", trade.symbol, fill, reason, trade.pnl());
        self.closed.push(position.trade);
    }
}

/// Price at which a protective level fills on `bar`, if it was touched.
///
/// A bar that opens through the level fills at the open.
fn level_fill(bar: &Bar, level: f64, side: Side, is_stop: bool) -> Option<f64> {
    // Longs stop out on the low and take profit on the high; shorts the reverse
    let (adverse, favourable) = match side {
        Side::Long => (bar.low, bar.high),
        Side::Short => (bar.high, bar.low),
    };
    let touched = |price: f64| {
        if is_stop {
            is_stop_hit(level, price, side)
        } else {
            is_target_hit(level, price, side)
        }
    };
    let extreme = if is_stop { adverse } else { favourable };
    touched(extreme).then(|| if touched(bar.open) { bar.open } else { level })
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

/// Deterministic single-symbol replay of one strategy.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay `bars` (oldest first) through `strategy`.
    pub fn run(&self, strategy: &dyn SignalStrategy, symbol: &str, bars: &[Bar]) -> Result<BacktestResult, BacktestError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(BacktestError::NoData(symbol.to_string()));
        };
        if !is_strictly_ordered(bars) {
            return Err(BacktestError::UnorderedBars(symbol.to_string()));
        }

        let config = &self.config;
        let window = config.lookback.max(strategy.warmup_period());
        let exit = strategy.exit_rules();
        let trailing = config.trailing_stop_atr_period.map(Atr::new);
        let mut ledger = Ledger::new(config);
        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut snapshots = vec![config.initial_capital];
        let mut peak = config.initial_capital;
        let mut max_drawdown = 0.0_f64;
        let mut evaluation_errors = 0usize;

        for (i, bar) in bars.iter().enumerate() {
            let at = bar.datetime();
            let Some(close) = to_decimal(bar.close) else {
                warn!("Skipping non-finite close at {} for {}", at, symbol);
                continue;
            };
            let is_last = i + 1 == bars.len();

            // (1) mark to market
            for position in &mut ledger.open {
                position.trade.mark(close);
            }

            // (2) exits, stop before target
            let mut index = 0;
            while index < ledger.open.len() {
                let position = &ledger.open[index];
                let trade = &position.trade;
                let side = trade.side;
                let stop = to_f64(trade.stop_loss);
                let target = to_f64(trade.take_profit);

                let exit_at = if let Some(fill) = level_fill(bar, stop, side, true) {
                    Some((fill, ExitReason::StopLoss))
                } else if let Some(fill) = level_fill(bar, target, side, false) {
                    Some((fill, ExitReason::TakeProfit))
                } else if i - position.entry_bar >= position.max_holding_bars {
                    Some((bar.close, ExitReason::TimeExit))
                } else if is_last {
                    Some((bar.close, ExitReason::EndOfPeriod))
                } else {
                    None
                };

                match exit_at.and_then(|(price, reason)| Some((to_decimal(price)?, reason))) {
                    Some((price, reason)) => ledger.close_position(index, price, at, reason),
                    None => index += 1,
                }
            }

            // survivors ratchet their stops on the close
            if let Some(atr) = &trailing {
                let start = (i + 1).saturating_sub(window.max(atr.period() + 1));
                if let Some(atr_value) = atr.latest(&bars[start..=i]) {
                    for position in &mut ledger.open {
                        let trade = &mut position.trade;
                        let current = to_f64(trade.stop_loss);
                        let next = trail_stop(current, bar.close, atr_value, trade.side, exit.stop_atr_multiplier);
                        if next != current {
                            if let Some(stop) = to_decimal(next) {
                                trade.stop_loss = stop;
                            }
                        }
                    }
                }
            }

            // (3) entries
            let has_position = ledger.open.iter().any(|p| p.trade.symbol == symbol);
            if !is_last && !has_position && ledger.open.len() < config.max_open_positions {
                let start = (i + 1).saturating_sub(window);
                match strategy.evaluate(symbol, &bars[start..=i]) {
                    Ok(Some(signal)) => {
                        if let Some(trade) = self.size_entry(&ledger, &signal, close, &exit) {
                            ledger.open_position(trade, close, i, exit.max_holding_bars);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        evaluation_errors += 1;
                        debug!("{} failed on {} at {}: {}", strategy.id(), symbol, at, e);
                    }
                }
            }

            // (4) equity, (5) drawdown
            let equity = ledger.equity(close);
            equity_curve.push(EquityPoint {
                timestamp: at,
                capital: equity,
            });
            if equity > peak {
                peak = equity;
            } else if peak > Decimal::ZERO {
                max_drawdown = max_drawdown.min(to_f64((equity - peak) / peak));
            }
            if (i + 1) % config.return_period_bars == 0 {
                snapshots.push(equity);
            }
        }

        if evaluation_errors > 0 {
            warn!("{} evaluation errors while backtesting {} on {}", evaluation_errors, strategy.id(), symbol);
        }

        let final_capital = ledger.cash;
        if snapshots.last() != Some(&final_capital) {
            snapshots.push(final_capital);
        }

        let stats = TradeStats::from_trades(&ledger.closed);
        let total_return = to_f64((final_capital - config.initial_capital) / config.initial_capital);
        let annualized = annualized_return(total_return, bars.len(), config.periods_per_year);
        let returns = periodic_returns(&snapshots);
        let return_periods_per_year = config.periods_per_year / config.return_period_bars as f64;

        let result = BacktestResult {
            strategy_id: strategy.id().to_string(),
            symbol: symbol.to_string(),
            start: first.datetime(),
            end: last.datetime(),
            bars: bars.len(),
            initial_capital: config.initial_capital,
            final_capital,
            net_pnl: final_capital - config.initial_capital,
            total_return,
            annualized_return: annualized,
            max_drawdown,
            sharpe_ratio: sharpe_ratio(&returns, return_periods_per_year),
            sortino_ratio: sortino_ratio(&returns, return_periods_per_year),
            calmar_ratio: calmar_ratio(annualized, max_drawdown),
            total_trades: stats.total_trades,
            winning_trades: stats.winning_trades,
            losing_trades: stats.losing_trades,
            win_rate: stats.win_rate,
            profit_factor: stats.profit_factor,
            expectancy: stats.expectancy,
            avg_win: stats.avg_win,
            avg_loss: stats.avg_loss,
            kelly_fraction: kelly_criterion(stats.win_rate, to_f64(stats.avg_win), to_f64(stats.avg_loss), 1.0),
            total_commission: ledger.commission,
            total_slippage: ledger.slippage,
            total_tax: ledger.tax,
            trades: ledger.closed,
            equity_curve,
        };

        info!(
            "Backtest {} on {}: {} trades, net {:.2} ({:.2}%), max drawdown {:.2}%",
            result.strategy_id,
            result.symbol,
            result.total_trades,
            result.net_pnl,
            result.total_return * 100.0,
            result.max_drawdown * 100.0
        );
        Ok(result)
    }

    /// Size an entry from running trade statistics, or `None` when it
    /// cannot be taken.
    fn size_entry(
        &self,
        ledger: &Ledger<'_>,
        signal: &quant_core::types::Signal,
        close: Decimal,
        exit: &quant_core::traits::ExitRules,
    ) -> Option<Trade> {
        let config = &self.config;
        let side = signal.direction.side()?;
        if side == Side::Short && !config.allow_short {
            return None;
        }

        let stats = TradeStats::from_trades(&ledger.closed);
        let (win_rate, avg_win, avg_loss) = if stats.total_trades >= config.min_trades_for_kelly {
            (stats.win_rate, to_f64(stats.avg_win), to_f64(stats.avg_loss))
        } else {
            (config.prior_win_rate, config.prior_avg_win, config.prior_avg_loss)
        };

        let cap = exit.max_position_fraction;
        let mut fraction = kelly_criterion(win_rate, avg_win, avg_loss, cap) * (signal.confidence / 100.0);
        if config.use_anti_martingale {
            fraction = anti_martingale(
                fraction,
                stats.win_streak,
                stats.loss_streak,
                config.anti_martingale_win_multiplier,
                config.anti_martingale_loss_multiplier,
            );
        }
        let fraction = to_decimal(fraction.clamp(0.0, cap))?;

        let fill = ledger.slipped(close, side == Side::Long);
        if fill <= Decimal::ZERO {
            return None;
        }
        let budget = ledger.equity(close) * fraction;
        let lots = (budget / (fill * config.lot_size)).floor();
        let mut quantity = lots * config.lot_size;
        // Never spend more cash than is on hand
        let unit_cost = fill * (Decimal::ONE + config.commission_rate);
        if quantity * unit_cost > ledger.cash {
            quantity = (ledger.cash / (unit_cost * config.lot_size)).floor() * config.lot_size;
        }
        if quantity <= Decimal::ZERO {
            return None;
        }

        let stop = to_decimal(signal.stop_loss?)?;
        let target = to_decimal(signal.take_profit?)?;
        Some(Trade::open(
            signal.symbol.clone(),
            signal.strategy_id.clone(),
            side,
            signal.timestamp,
            fill,
            quantity,
            stop,
            target,
        ))
    }
}
