//! Core types and traits for the quantitative trading core.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries, Timeframe)
//! - Signals, trades and exit reasons
//! - Core traits for indicators, strategies, market data and persistence

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DataError, IndicatorError, StoreError, StrategyError};
pub use traits::*;
pub use types::*;
