//! Persistence boundary for trades and signals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Signal, Trade};

/// Trade persistence.
///
/// Implementations keep open trades indexed by symbol so per-tick risk
/// checks do not scan history.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn insert_trade(&self, trade: Trade) -> Result<(), StoreError>;

    /// Replace a stored trade (matched by id).
    async fn update_trade(&self, trade: Trade) -> Result<(), StoreError>;

    async fn open_trades(&self) -> Result<Vec<Trade>, StoreError>;

    async fn open_trade_for_symbol(&self, symbol: &str) -> Result<Option<Trade>, StoreError>;

    /// Every trade, in insertion order.
    async fn trade_history(&self) -> Result<Vec<Trade>, StoreError>;

    async fn closed_trades_since(&self, since: DateTime<Utc>) -> Result<Vec<Trade>, StoreError> {
        Ok(self
            .trade_history()
            .await?
            .into_iter()
            .filter(|t| t.is_closed() && t.exit_time.is_some_and(|at| at >= since))
            .collect())
    }
}

/// Append-only signal log.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn insert_signal(&self, signal: Signal) -> Result<(), StoreError>;

    /// Newest first, optionally filtered by symbol.
    async fn signals(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<Signal>, StoreError>;

    /// Oldest first, so consumers handle signals in emission order.
    async fn unprocessed_signals(&self, limit: usize) -> Result<Vec<Signal>, StoreError>;

    async fn mark_processed(&self, id: Uuid, trade_id: Option<Uuid>) -> Result<(), StoreError>;
}
