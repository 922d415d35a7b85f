//! Market data and persistence backends.
//!
//! - [`CsvDataSource`]: bars from CSV files
//! - [`InMemoryMarketData`]: bar series held in memory
//! - [`SyntheticMarketData`]: seeded random-walk bars
//! - [`MemoryStore`]: trade and signal store with an open-trade index
//! - [`scenarios`]: hand-shaped bar sequences for tests and demos

mod cache;
mod csv_source;
mod memory_store;
pub mod scenarios;
mod synthetic;

pub use cache::InMemoryMarketData;
pub use csv_source::{load_bars, parse_timestamp, CsvDataSource};
pub use memory_store::MemoryStore;
pub use synthetic::SyntheticMarketData;

use std::path::Path;

use quant_core::error::DataError;
use quant_core::types::Bar;

/// Load every bar from a single CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    load_bars(path.as_ref())
}
