//! Technical indicators with SIMD kernels.
//!
//! Pure, side-effect-free transforms of bar sequences:
//! - Moving averages (SMA, EMA)
//! - Momentum (RSI, MACD)
//! - Volatility (ATR, Bollinger Bands, standard deviation)
//! - Volume (VWAP, volume profile)
//! - Support/resistance levels
//! - Position sizing (Kelly criterion, anti-martingale)
//!
//! Every indicator returns an empty series when the input is shorter than
//! its warm-up; numeric degeneracies resolve to a defined value, never a panic.

pub mod levels;
pub mod momentum;
pub mod moving_average;
pub mod simd;
pub mod sizing;
pub mod volatility;
pub mod volume;

pub use levels::{SupportResistance, SupportResistanceOutput};
pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
pub use sizing::{anti_martingale, kelly_criterion, ANTI_MARTINGALE_MAX_FRACTION};
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev};
pub use volume::{VolumeProfile, VolumeProfileOutput, Vwap};
