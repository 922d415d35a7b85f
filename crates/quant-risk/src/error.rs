use quant_core::error::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Position blocked for {symbol}: {reason}")]
    Blocked { symbol: String, reason: String },

    #[error("Open trade not found: {0}")]
    TradeNotFound(Uuid),

    #[error("Invalid risk limits: {0}")]
    InvalidLimits(String),

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Risk state unavailable: {0}")]
    Store(#[from] StoreError),
}
