//! Account risk manager.
//!
//! Owns the circuit-breaker state and the active [`RiskLimits`], and gates
//! every new position against the trade store. Both live in `watch`
//! channels: limits are swapped whole, and breaker trips are broadcast to
//! in-progress scans.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use quant_core::traits::TradeStore;
use quant_core::types::{BreakerCause, ExitReason, Signal, Trade};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::circuit_breaker::{evaluate_breakers, BreakerState};
use crate::metrics::{calculate_risk_metrics, RiskMetrics};
use crate::position_sizer::validate_position_size;
use crate::{RiskError, RiskLimits};

pub struct RiskManager {
    store: Arc<dyn TradeStore>,
    capital: Decimal,
    limits: watch::Sender<Arc<RiskLimits>>,
    breaker: watch::Sender<BreakerState>,
}

impl RiskManager {
    pub fn new(
        store: Arc<dyn TradeStore>,
        capital: Decimal,
        limits: RiskLimits,
    ) -> Result<Self, RiskError> {
        limits.validate()?;
        if capital <= Decimal::ZERO {
            return Err(RiskError::InvalidLimits(format!(
                "account capital must be positive, got {}",
                capital
            )));
        }

        let (limits, _) = watch::channel(Arc::new(limits));
        let (breaker, _) = watch::channel(BreakerState::Armed);

        Ok(Self {
            store,
            capital,
            limits,
            breaker,
        })
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    /// Snapshot of the active limits.
    pub fn limits(&self) -> Arc<RiskLimits> {
        self.limits.borrow().clone()
    }

    /// Swap in a new set of limits. Checks already running keep the
    /// snapshot they started with.
    pub fn replace_limits(&self, limits: RiskLimits) -> Result<(), RiskError> {
        limits.validate()?;
        info!("Risk limits replaced: {:?}", limits);
        self.limits.send_replace(Arc::new(limits));
        Ok(())
    }

    pub fn breaker_state(&self) -> BreakerState {
        *self.breaker.borrow()
    }

    /// Receiver notified on every breaker transition.
    pub fn breaker_watch(&self) -> watch::Receiver<BreakerState> {
        self.breaker.subscribe()
    }

    pub fn is_circuit_breaker_triggered(&self) -> bool {
        self.breaker.borrow().is_tripped()
    }

    pub async fn calculate_risk_metrics(&self) -> Result<RiskMetrics, RiskError> {
        self.calculate_risk_metrics_at(Utc::now()).await
    }

    pub async fn calculate_risk_metrics_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<RiskMetrics, RiskError> {
        let history = self.store.trade_history().await?;
        let mut metrics = calculate_risk_metrics(&history, self.capital, now);
        metrics.is_circuit_breaker_triggered = self.is_circuit_breaker_triggered();
        Ok(metrics)
    }

    /// Evaluate the breakers before an entry on `symbol`.
    ///
    /// Returns `false` when trading is halted. A failure to read risk state
    /// trips the breaker.
    pub async fn check_circuit_breakers(&self, symbol: &str) -> bool {
        self.check_circuit_breakers_at(symbol, Utc::now()).await
    }

    pub async fn check_circuit_breakers_at(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        if let Some(cause) = self.breaker_state().cause() {
            debug!("Breaker already tripped ({}), blocking {}", cause, symbol);
            return false;
        }

        let limits = self.limits();
        let cause = match self.calculate_risk_metrics_at(now).await {
            Ok(metrics) => evaluate_breakers(&metrics, &limits, self.capital),
            Err(e) => {
                error!("Failed to load risk state while checking {}: {}", symbol, e);
                Some(BreakerCause::RiskStateUnavailable)
            }
        };

        match cause {
            None => true,
            Some(cause) => {
                self.trip(cause, now).await;
                false
            }
        }
    }

    /// Re-arm the breakers after an operator review.
    pub fn reset_circuit_breakers(&self) {
        let previous = self.breaker.send_replace(BreakerState::Armed);
        if let Some(cause) = previous.cause() {
            info!("Circuit breaker reset (was tripped by {})", cause);
        }
    }

    async fn trip(&self, cause: BreakerCause, now: DateTime<Utc>) {
        let transitioned = self.breaker.send_if_modified(|state| {
            if state.is_tripped() {
                false
            } else {
                *state = BreakerState::Tripped { cause, at: now };
                true
            }
        });
        if !transitioned {
            return;
        }

        warn!("Circuit breaker tripped: {}", cause);
        let closed = self
            .close_all_positions(ExitReason::CircuitBreaker(cause), now)
            .await;
        warn!("Closed {} open positions after breaker trip", closed);
    }

    async fn close_all_positions(&self, reason: ExitReason, now: DateTime<Utc>) -> usize {
        let open = match self.store.open_trades().await {
            Ok(trades) => trades,
            Err(e) => {
                error!("Could not list open trades to close: {}", e);
                return 0;
            }
        };

        let mut closed = 0;
        for mut trade in open {
            let price = trade.mark_price.unwrap_or(trade.entry_price);
            trade.close(price, now, reason);
            match self.store.update_trade(trade.clone()).await {
                Ok(()) => closed += 1,
                Err(e) => error!("Failed to close trade {} ({}): {}", trade.id, trade.symbol, e),
            }
        }
        closed
    }

    /// Whether a new position on `symbol` is allowed right now.
    ///
    /// Re-evaluates the breakers against trade history first. Any store
    /// failure answers `false`.
    pub async fn can_open_position(&self, symbol: &str) -> bool {
        self.can_open_position_at(symbol, Utc::now()).await
    }

    pub async fn can_open_position_at(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.entry_block_reason(symbol, now).await.is_none()
    }

    async fn entry_block_reason(&self, symbol: &str, now: DateTime<Utc>) -> Option<String> {
        if !self.check_circuit_breakers_at(symbol, now).await {
            let cause = self
                .breaker_state()
                .cause()
                .unwrap_or(BreakerCause::RiskStateUnavailable);
            return Some(format!("circuit breaker tripped ({})", cause));
        }

        let limits = self.limits();
        let open = match self.store.open_trades().await {
            Ok(trades) => trades,
            Err(e) => return Some(format!("risk state unavailable: {}", e)),
        };
        if open.len() >= limits.max_open_positions {
            return Some(format!(
                "max open positions reached ({}/{})",
                open.len(),
                limits.max_open_positions
            ));
        }

        match self.store.open_trade_for_symbol(symbol).await {
            Ok(Some(existing)) => Some(format!("position {} already open", existing.id)),
            Ok(None) => None,
            Err(e) => Some(format!("risk state unavailable: {}", e)),
        }
    }

    /// Size a position for `signal` under the active limits.
    pub fn validate_position_size(
        &self,
        signal: &Signal,
        balance: Decimal,
        win_rate: f64,
        avg_win: f64,
        avg_loss: f64,
    ) -> Decimal {
        validate_position_size(signal, balance, win_rate, avg_win, avg_loss, &self.limits())
    }

    /// Gate and persist a new trade.
    ///
    /// The trade only counts as open once the store accepted it.
    pub async fn open_position(&self, trade: Trade) -> Result<Trade, RiskError> {
        if !trade.is_open() || trade.quantity <= Decimal::ZERO {
            return Err(RiskError::InvalidTrade(format!(
                "{} must be open with a positive quantity",
                trade.id
            )));
        }

        if let Some(reason) = self.entry_block_reason(&trade.symbol, Utc::now()).await {
            debug!("Entry on {} blocked: {}", trade.symbol, reason);
            return Err(RiskError::Blocked {
                symbol: trade.symbol,
                reason,
            });
        }

        if let Err(e) = self.store.insert_trade(trade.clone()).await {
            error!("Failed to persist trade {} on {}: {}", trade.id, trade.symbol, e);
            return Err(e.into());
        }

        info!(
            "Opened {} {} x{} @ {} (stop {}, target {})",
            trade.side, trade.symbol, trade.quantity, trade.entry_price, trade.stop_loss, trade.take_profit
        );
        Ok(trade)
    }

    /// Close an open trade and realize its PnL.
    pub async fn close_position(
        &self,
        id: Uuid,
        price: Decimal,
        reason: ExitReason,
    ) -> Result<Trade, RiskError> {
        let mut trade = self
            .store
            .open_trades()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(RiskError::TradeNotFound(id))?;

        trade.close(price, Utc::now(), reason);
        self.store.update_trade(trade.clone()).await?;

        info!(
            "Closed {} {} @ {} ({}), pnl {}",
            trade.side,
            trade.symbol,
            price,
            reason,
            trade.pnl()
        );
        Ok(trade)
    }

    /// Update unrealized PnL of the open trade on `symbol`.
    pub async fn mark_to_market(&self, symbol: &str, price: Decimal) -> Result<Option<Trade>, RiskError> {
        let Some(mut trade) = self.store.open_trade_for_symbol(symbol).await? else {
            return Ok(None);
        };

        trade.mark(price);
        self.store.update_trade(trade.clone()).await?;
        Ok(Some(trade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use quant_core::error::StoreError;
    use quant_core::types::Side;
    use quant_data::MemoryStore;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap()
    }

    fn long(symbol: &str, entry: Decimal) -> Trade {
        Trade::open(
            symbol,
            "test",
            Side::Long,
            now() - Duration::hours(2),
            entry,
            dec!(10),
            entry - dec!(5),
            entry + dec!(10),
        )
    }

    fn closed(symbol: &str, pnl_per_share: Decimal, at: DateTime<Utc>) -> Trade {
        let mut trade = long(symbol, dec!(100));
        trade.close(dec!(100) + pnl_per_share, at, ExitReason::StopLoss);
        trade
    }

    fn manager(store: Arc<dyn TradeStore>, limits: RiskLimits) -> RiskManager {
        RiskManager::new(store, dec!(100000), limits).unwrap()
    }

    struct UnavailableStore;

    #[async_trait]
    impl TradeStore for UnavailableStore {
        async fn insert_trade(&self, _: Trade) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn update_trade(&self, _: Trade) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn open_trades(&self) -> Result<Vec<Trade>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn open_trade_for_symbol(&self, _: &str) -> Result<Option<Trade>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn trade_history(&self) -> Result<Vec<Trade>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_open_count_at_limit_blocks_entries() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store.clone(), RiskLimits::default().with_max_open_positions(2));

        risk.open_position(long("AAPL", dec!(100))).await.unwrap();
        assert!(risk.can_open_position("MSFT").await);
        risk.open_position(long("MSFT", dec!(50))).await.unwrap();

        assert!(!risk.can_open_position("NVDA").await);
        let err = risk.open_position(long("NVDA", dec!(30))).await.unwrap_err();
        assert!(matches!(err, RiskError::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_one_position_per_symbol() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store, RiskLimits::default());

        risk.open_position(long("AAPL", dec!(100))).await.unwrap();
        assert!(!risk.can_open_position("AAPL").await);
        assert!(risk.can_open_position("MSFT").await);
    }

    #[tokio::test]
    async fn test_consecutive_losses_trip_and_close_positions() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            store
                .insert_trade(closed("LOSS", dec!(-1), now() - Duration::days(10 - i)))
                .await
                .unwrap();
        }
        let risk = manager(store.clone(), RiskLimits::default());
        let open = long("AAPL", dec!(100));
        store.insert_trade(open.clone()).await.unwrap();

        let mut watch = risk.breaker_watch();
        assert!(!risk.check_circuit_breakers_at("AAPL", now()).await);
        assert!(risk.is_circuit_breaker_triggered());
        assert!(watch.has_changed().unwrap());
        assert_eq!(
            watch.borrow_and_update().cause(),
            Some(BreakerCause::ConsecutiveLosses)
        );

        assert!(store.open_trades().await.unwrap().is_empty());
        let history = store.trade_history().await.unwrap();
        let forced = history.iter().find(|t| t.id == open.id).unwrap();
        assert_eq!(
            forced.exit_reason,
            Some(ExitReason::CircuitBreaker(BreakerCause::ConsecutiveLosses))
        );
        assert_eq!(
            forced.exit_reason.map(|r| r.to_string()).as_deref(),
            Some("circuit_breaker_consecutive_losses")
        );

        let metrics = risk.calculate_risk_metrics_at(now()).await.unwrap();
        assert!(metrics.is_circuit_breaker_triggered);
        assert!(!risk.can_open_position("MSFT").await);
    }

    #[tokio::test]
    async fn test_entry_gate_evaluates_breakers_from_history() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..6 {
            store
                .insert_trade(closed("LOSS", dec!(-1), now() - Duration::days(10 - i)))
                .await
                .unwrap();
        }
        let risk = manager(store.clone(), RiskLimits::default());
        assert!(!risk.is_circuit_breaker_triggered());

        assert!(!risk.can_open_position_at("AAPL", now()).await);
        assert_eq!(risk.breaker_state().cause(), Some(BreakerCause::ConsecutiveLosses));

        let err = risk.open_position(long("AAPL", dec!(100))).await.unwrap_err();
        assert!(matches!(err, RiskError::Blocked { .. }));
        assert!(store.open_trade_for_symbol("AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_position_trips_on_losses_since_last_check() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store.clone(), RiskLimits::default());
        assert!(risk.can_open_position("AAPL").await);

        for i in 0..5 {
            store
                .insert_trade(closed("LOSS", dec!(-1), now() - Duration::days(10 - i)))
                .await
                .unwrap();
        }

        let err = risk.open_position(long("AAPL", dec!(100))).await.unwrap_err();
        assert!(matches!(err, RiskError::Blocked { .. }));
        assert!(risk.is_circuit_breaker_triggered());
    }

    #[tokio::test]
    async fn test_breaker_stays_tripped_until_reset() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            store
                .insert_trade(closed("LOSS", dec!(-1), now() - Duration::days(10 - i)))
                .await
                .unwrap();
        }
        let risk = manager(store.clone(), RiskLimits::default());
        assert!(!risk.check_circuit_breakers_at("AAPL", now()).await);

        // A win ends the streak, but the breaker does not re-arm by itself
        store
            .insert_trade(closed("WIN", dec!(2), now() - Duration::days(1)))
            .await
            .unwrap();
        assert!(!risk.check_circuit_breakers_at("AAPL", now()).await);

        risk.reset_circuit_breakers();
        assert!(!risk.is_circuit_breaker_triggered());
        assert!(risk.check_circuit_breakers_at("AAPL", now()).await);
    }

    #[tokio::test]
    async fn test_daily_loss_exactly_at_limit_trips() {
        let store = Arc::new(MemoryStore::new());
        // 10 shares x -200 = -2000 = -2% of 100000
        store
            .insert_trade(closed("AAPL", dec!(-200), now() - Duration::hours(1)))
            .await
            .unwrap();
        let risk = manager(store, RiskLimits::default());

        assert!(!risk.check_circuit_breakers_at("AAPL", now()).await);
        assert_eq!(risk.breaker_state().cause(), Some(BreakerCause::DailyLoss));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let risk = manager(Arc::new(UnavailableStore), RiskLimits::default());

        assert!(!risk.can_open_position("AAPL").await);
        assert!(!risk.check_circuit_breakers_at("AAPL", now()).await);
        assert_eq!(
            risk.breaker_state().cause(),
            Some(BreakerCause::RiskStateUnavailable)
        );
        assert!(risk.calculate_risk_metrics().await.is_err());
    }

    #[tokio::test]
    async fn test_replace_limits_keeps_old_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store, RiskLimits::default());

        let before = risk.limits();
        assert!(risk
            .replace_limits(RiskLimits::default().with_max_daily_loss(dec!(0.5)))
            .is_err());
        risk.replace_limits(RiskLimits::default().with_max_open_positions(1))
            .unwrap();

        assert_eq!(before.max_open_positions, 5);
        assert_eq!(risk.limits().max_open_positions, 1);
    }

    #[tokio::test]
    async fn test_mark_and_close_position() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store.clone(), RiskLimits::default());

        let trade = risk.open_position(long("AAPL", dec!(100))).await.unwrap();
        let marked = risk.mark_to_market("AAPL", dec!(103)).await.unwrap().unwrap();
        assert_eq!(marked.unrealized_pnl, dec!(30));
        assert!(risk.mark_to_market("MSFT", dec!(10)).await.unwrap().is_none());

        let closed = risk
            .close_position(trade.id, dec!(110), ExitReason::TakeProfit)
            .await
            .unwrap();
        assert_eq!(closed.realized_pnl, Some(dec!(100)));
        assert!(store.open_trade_for_symbol("AAPL").await.unwrap().is_none());

        let missing = risk
            .close_position(trade.id, dec!(110), ExitReason::TakeProfit)
            .await;
        assert!(matches!(missing, Err(RiskError::TradeNotFound(_))));
    }

    #[tokio::test]
    async fn test_position_sizing_uses_active_limits() {
        let store = Arc::new(MemoryStore::new());
        let risk = manager(store, RiskLimits::default().with_max_position_size(dec!(0.02)));
        let signal = Signal::new(
            "AAPL",
            "test",
            quant_core::types::SignalDirection::Buy,
            100.0,
            100.0,
            now(),
        );

        let size = risk.validate_position_size(&signal, dec!(100000), 0.6, 200.0, 100.0);
        assert_eq!(size, dec!(2000));
    }
}
