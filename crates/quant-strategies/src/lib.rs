//! Score-based signal strategies.
//!
//! Every strategy scores the latest bar of a window on a 0-100 point scale
//! for each direction and emits a [`quant_core::types::Signal`] when the
//! winning side clears its [`SignalGate`]:
//! - Mean reversion (RSI extremes at the Bollinger bands)
//! - Momentum breakout (MACD acceleration through the recent range)
//! - Trend following (EMA crossovers and pullbacks)
//! - VWAP reversion (stretched moves away from the rolling VWAP)
//!
//! Strategies hold only configuration, so evaluation is deterministic
//! and instances can be shared across threads.

mod mean_reversion;
mod momentum;
mod registry;
mod scoring;
mod trend_following;
mod vwap_reversion;

pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy, MEAN_REVERSION_ID};
pub use momentum::{MomentumConfig, MomentumStrategy, MOMENTUM_BREAKOUT_ID};
pub use registry::{StrategyInfo, StrategyRegistry, StrategySettings};
pub use scoring::{ScoreCard, SignalGate};
pub use trend_following::{TrendFollowingConfig, TrendFollowingStrategy, TREND_FOLLOWING_ID};
pub use vwap_reversion::{VwapReversionConfig, VwapReversionStrategy, VWAP_REVERSION_ID};
