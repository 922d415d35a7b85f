//! Core traits.

mod indicator;
mod market_data;
mod store;
mod strategy;

pub use indicator::{ensure_warmup, BarIndicator, Indicator, MultiOutputIndicator};
pub use market_data::MarketDataProvider;
pub use store::{SignalStore, TradeStore};
pub use strategy::{ExitRules, SignalStrategy, StrategyConfig};
