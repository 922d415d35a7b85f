//! Backtesting: deterministic single-symbol replay of a strategy with a
//! commission, slippage and tax cost model, plus parallel multi-strategy
//! runs and text/JSON/CSV reporting.

mod comprehensive;
mod engine;
mod error;
mod report;
mod statistics;

pub use comprehensive::ComprehensiveBacktest;
pub use engine::{BacktestConfig, BacktestEngine, BacktestResult, EquityPoint};
pub use error::BacktestError;
pub use report::generate_performance_report;
pub use statistics::{annualized_return, calmar_ratio, periodic_returns, sharpe_ratio, sortino_ratio, TradeStats};
