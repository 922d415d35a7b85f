//! Risk management for the quantitative core.
//!
//! Computes account risk metrics from trade history, trips circuit
//! breakers, gates new positions and derives stop/target levels and
//! position sizes.

mod circuit_breaker;
mod error;
mod limits;
mod metrics;
mod position_sizer;
mod risk_manager;
mod stop_loss;

pub use circuit_breaker::{evaluate_breakers, BreakerState};
pub use error::RiskError;
pub use limits::RiskLimits;
pub use metrics::{calculate_risk_metrics, consecutive_losses, RiskMetrics};
pub use position_sizer::{validate_position_size, FALLBACK_POSITION_FRACTION, MIN_POSITION_FRACTION};
pub use risk_manager::RiskManager;
pub use stop_loss::{calculate_stop_loss, calculate_take_profit, is_stop_hit, is_target_hit, trail_stop};
