//! Trades (positions) and how they end.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
    Cancelled,
}

/// Which circuit breaker tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerCause {
    DailyLoss,
    MaxDrawdown,
    ConsecutiveLosses,
    LowWinRate,
    /// Risk state could not be computed; entries are blocked.
    RiskStateUnavailable,
}

impl BreakerCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerCause::DailyLoss => "daily_loss",
            BreakerCause::MaxDrawdown => "max_drawdown",
            BreakerCause::ConsecutiveLosses => "consecutive_losses",
            BreakerCause::LowWinRate => "low_win_rate",
            BreakerCause::RiskStateUnavailable => "risk_state_unavailable",
        }
    }
}

impl fmt::Display for BreakerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeExit,
    CircuitBreaker(BreakerCause),
    EndOfPeriod,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("stop_loss"),
            ExitReason::TakeProfit => f.write_str("take_profit"),
            ExitReason::TimeExit => f.write_str("time_exit"),
            ExitReason::CircuitBreaker(cause) => write!(f, "circuit_breaker_{}", cause),
            ExitReason::EndOfPeriod => f.write_str("end_of_period"),
        }
    }
}

/// A position from entry to exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub strategy_id: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<Decimal>,
    /// Commissions charged so far (both legs once closed).
    pub fees: Decimal,
    pub taxes: Decimal,
    /// Net realized PnL, set on close.
    pub realized_pnl: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    /// Last price the trade was marked at.
    pub mark_price: Option<Decimal>,
    pub status: TradeStatus,
    pub exit_reason: Option<ExitReason>,
    pub signal_id: Option<Uuid>,
}

impl Trade {
    /// Open a new trade.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: impl Into<String>,
        strategy_id: impl Into<String>,
        side: Side,
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        quantity: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            strategy_id: strategy_id.into(),
            side,
            entry_time,
            entry_price,
            quantity,
            stop_loss,
            take_profit,
            exit_time: None,
            exit_price: None,
            fees: Decimal::ZERO,
            taxes: Decimal::ZERO,
            realized_pnl: None,
            unrealized_pnl: Decimal::ZERO,
            mark_price: None,
            status: TradeStatus::Open,
            exit_reason: None,
            signal_id: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_signal(mut self, signal_id: Uuid) -> Self {
        self.signal_id = Some(signal_id);
        self
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    pub fn notional(&self) -> Decimal {
        self.entry_price * self.quantity
    }

    /// Price move in the trade's favour times quantity, before costs.
    pub fn gross_pnl_at(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity * self.side.sign()
    }

    /// Update the unrealized PnL against a new mark.
    pub fn mark(&mut self, price: Decimal) {
        if !self.is_open() {
            return;
        }
        self.mark_price = Some(price);
        self.unrealized_pnl = self.gross_pnl_at(price);
    }

    /// Close the trade. Realized PnL is gross minus recorded fees and taxes.
    pub fn close(&mut self, price: Decimal, at: DateTime<Utc>, reason: ExitReason) {
        if !self.is_open() {
            return;
        }
        let net = self.gross_pnl_at(price) - self.fees - self.taxes;
        self.exit_price = Some(price);
        self.exit_time = Some(at);
        self.realized_pnl = Some(net);
        self.unrealized_pnl = Decimal::ZERO;
        self.mark_price = Some(price);
        self.status = TradeStatus::Closed;
        self.exit_reason = Some(reason);
    }

    /// Net PnL: realized when closed, unrealized while open.
    pub fn pnl(&self) -> Decimal {
        match self.status {
            TradeStatus::Closed => self.realized_pnl.unwrap_or_default(),
            TradeStatus::Open => self.unrealized_pnl,
            TradeStatus::Cancelled => Decimal::ZERO,
        }
    }
}
