//! Fixed-interval driver for the signal engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::SignalEngine;

pub struct Scheduler;

impl Scheduler {
    /// Run cycles at the engine's configured scan interval.
    pub fn spawn(engine: Arc<SignalEngine>) -> SchedulerHandle {
        let period = engine.config().scan_interval();
        Self::spawn_every(engine, period)
    }

    /// Run a cycle now and then every `period` until stopped.
    ///
    /// Ticks missed while a cycle runs long are dropped, not queued.
    pub fn spawn_every(engine: Arc<SignalEngine>, period: Duration) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Signal scheduler started, interval {:?}", period);

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let report = engine.run_cycle().await;
                        debug!("Cycle finished: {:?}, {} signals", report.outcome, report.signals.len());
                    }
                }
            }

            info!("Signal scheduler stopped");
        });

        SchedulerHandle { stop: stop_tx, task }
    }
}

/// Owner of a running scheduler.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for the current cycle to finish.
    pub async fn stop(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            warn!("Signal scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
