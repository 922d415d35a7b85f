//! Core data types.

mod ohlcv;
mod signal;
mod timeframe;
mod trade;

pub use ohlcv::{closes, is_strictly_ordered, volumes, Bar, BarSeries};
pub use signal::{Signal, SignalDirection};
pub use timeframe::{Timeframe, TRADING_DAYS_PER_YEAR};
pub use trade::{BreakerCause, ExitReason, Side, Trade, TradeStatus};
