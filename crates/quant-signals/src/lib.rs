//! Signal engine.
//!
//! [`SignalEngine`] runs one scan cycle at a time over a symbol universe:
//! risk gate, bar fetch, strategy scoring, persistence. [`Scheduler`]
//! drives it on a fixed interval until stopped.

mod engine;
mod error;
mod market_hours;
mod scheduler;

pub use engine::{CycleOutcome, EngineConfig, ScanPhase, ScanReport, SignalEngine};
pub use error::EngineError;
pub use market_hours::MarketHours;
pub use scheduler::{Scheduler, SchedulerHandle};
