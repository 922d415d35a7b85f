//! In-memory trade and signal store.

use std::collections::HashMap;

use async_trait::async_trait;
use quant_core::error::StoreError;
use quant_core::traits::{SignalStore, TradeStore};
use quant_core::types::{Signal, Trade};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    trades: HashMap<Uuid, Trade>,
    /// Insertion order of trade ids
    order: Vec<Uuid>,
    open_by_symbol: HashMap<String, Uuid>,
    signals: Vec<Signal>,
}

/// Trade and signal store kept in process memory.
///
/// Open trades are indexed by symbol; the index is maintained on insert and
/// on every update that changes a trade's status.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn trade_count(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn signal_count(&self) -> usize {
        self.inner.read().await.signals.len()
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn insert_trade(&self, trade: Trade) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if inner.trades.contains_key(&trade.id) {
            return Err(StoreError::Duplicate(format!("trade {}", trade.id)));
        }
        if trade.is_open() {
            if let Some(existing) = inner.open_by_symbol.get(&trade.symbol) {
                return Err(StoreError::Duplicate(format!(
                    "open trade {} already exists for {}",
                    existing, trade.symbol
                )));
            }
            inner.open_by_symbol.insert(trade.symbol.clone(), trade.id);
        }

        inner.order.push(trade.id);
        inner.trades.insert(trade.id, trade);
        Ok(())
    }

    async fn update_trade(&self, trade: Trade) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if !inner.trades.contains_key(&trade.id) {
            return Err(StoreError::NotFound(format!("trade {}", trade.id)));
        }

        let indexed = inner.open_by_symbol.get(&trade.symbol) == Some(&trade.id);
        if trade.is_open() && !indexed {
            inner.open_by_symbol.insert(trade.symbol.clone(), trade.id);
        } else if !trade.is_open() && indexed {
            inner.open_by_symbol.remove(&trade.symbol);
        }

        inner.trades.insert(trade.id, trade);
        Ok(())
    }

    async fn open_trades(&self) -> Result<Vec<Trade>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.trades.get(id))
            .filter(|t| t.is_open())
            .cloned()
            .collect())
    }

    async fn open_trade_for_symbol(&self, symbol: &str) -> Result<Option<Trade>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .open_by_symbol
            .get(symbol)
            .and_then(|id| inner.trades.get(id))
            .cloned())
    }

    async fn trade_history(&self) -> Result<Vec<Trade>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.trades.get(id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert_signal(&self, signal: Signal) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.signals.iter().any(|s| s.id == signal.id) {
            return Err(StoreError::Duplicate(format!("signal {}", signal.id)));
        }
        inner.signals.push(signal);
        Ok(())
    }

    async fn signals(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .signals
            .iter()
            .rev()
            .filter(|s| symbol.map_or(true, |sym| s.symbol == sym))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn unprocessed_signals(&self, limit: usize) -> Result<Vec<Signal>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .signals
            .iter()
            .filter(|s| !s.processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, trade_id: Option<Uuid>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let signal = inner
            .signals
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("signal {}", id)))?;
        signal.processed = true;
        signal.trade_id = trade_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quant_core::types::{ExitReason, Side, SignalDirection};
    use rust_decimal_macros::dec;

    fn trade(symbol: &str) -> Trade {
        Trade::open(
            symbol,
            "test",
            Side::Long,
            Utc::now(),
            dec!(100),
            dec!(1),
            dec!(95),
            dec!(110),
        )
    }

    #[tokio::test]
    async fn test_symbol_index_follows_status() {
        let store = MemoryStore::new();
        let mut t = trade("AAPL");
        store.insert_trade(t.clone()).await.unwrap();

        assert_eq!(store.open_trade_for_symbol("AAPL").await.unwrap().map(|x| x.id), Some(t.id));
        assert!(matches!(
            store.insert_trade(trade("AAPL")).await,
            Err(StoreError::Duplicate(_))
        ));

        t.close(dec!(105), Utc::now(), ExitReason::TakeProfit);
        store.update_trade(t.clone()).await.unwrap();

        assert!(store.open_trade_for_symbol("AAPL").await.unwrap().is_none());
        assert!(store.open_trades().await.unwrap().is_empty());
        assert_eq!(store.trade_history().await.unwrap().len(), 1);

        // Symbol is free again
        store.insert_trade(trade("AAPL")).await.unwrap();
        assert_eq!(store.trade_count().await, 2);
    }

    #[tokio::test]
    async fn test_update_unknown_trade() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_trade(trade("MSFT")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_signal_queries() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = Signal::new("AAPL", "s", SignalDirection::Buy, 80.0, 100.0, now);
        let second = Signal::new("MSFT", "s", SignalDirection::Sell, 75.0, 50.0, now);
        let third = Signal::new("AAPL", "s", SignalDirection::Sell, 90.0, 101.0, now);

        for s in [first.clone(), second.clone(), third.clone()] {
            store.insert_signal(s).await.unwrap();
        }

        let newest: Vec<Uuid> = store.signals(None, 2).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(newest, vec![third.id, second.id]);

        let aapl = store.signals(Some("AAPL"), 10).await.unwrap();
        assert_eq!(aapl.len(), 2);
        assert_eq!(aapl[0].id, third.id);

        let trade_id = Uuid::new_v4();
        store.mark_processed(first.id, Some(trade_id)).await.unwrap();
        let pending = store.unprocessed_signals(10).await.unwrap();
        assert_eq!(pending.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, third.id]);

        let stored = store.signals(Some("AAPL"), 10).await.unwrap();
        assert_eq!(stored[1].trade_id, Some(trade_id));
        assert!(store.mark_processed(Uuid::new_v4(), None).await.is_err());
    }
}
