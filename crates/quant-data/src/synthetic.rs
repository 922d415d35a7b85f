//! Seeded synthetic bars.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Weekday};
use quant_core::error::DataError;
use quant_core::traits::MarketDataProvider;
use quant_core::types::{Bar, Timeframe};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 2024-12-31T00:00:00Z
const DEFAULT_ANCHOR_MS: i64 = 1_735_603_200_000;
const DAY_MS: i64 = 86_400_000;
/// Bars between drift changes.
const REGIME_LENGTH: usize = 40;

/// Random-walk bars for demos, tests and offline backtests.
///
/// Output depends only on the seed, the symbol, the timeframe and the
/// requested length, never on the wall clock. Daily bars skip weekends.
#[derive(Debug, Clone)]
pub struct SyntheticMarketData {
    seed: u64,
    anchor_ms: i64,
    volatility: f64,
}

impl SyntheticMarketData {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            anchor_ms: DEFAULT_ANCHOR_MS,
            volatility: 0.02,
        }
    }

    /// Timestamp (Unix ms) of the last generated bar.
    pub fn with_anchor(mut self, anchor_ms: i64) -> Self {
        self.anchor_ms = anchor_ms;
        self
    }

    /// Maximum absolute per-bar return before drift.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility.abs();
        self
    }

    fn rng_for(&self, symbol: &str, timeframe: Timeframe) -> StdRng {
        StdRng::seed_from_u64(self.seed ^ fnv1a(symbol.as_bytes()) ^ timeframe.as_secs())
    }

    fn timestamps(&self, timeframe: Timeframe, count: usize) -> Vec<i64> {
        let step = timeframe.as_millis();
        let mut stamps = Vec::with_capacity(count);
        let mut ts = self.anchor_ms;

        while stamps.len() < count {
            let is_weekend = timeframe == Timeframe::Daily
                && DateTime::from_timestamp_millis(ts)
                    .is_some_and(|dt| matches!(dt.weekday(), Weekday::Sat | Weekday::Sun));
            if !is_weekend {
                stamps.push(ts);
            }
            ts -= if timeframe == Timeframe::Daily { DAY_MS } else { step };
        }

        stamps.reverse();
        stamps
    }

    /// `count` bars for `symbol`, oldest first.
    pub fn generate(&self, symbol: &str, timeframe: Timeframe, count: usize) -> Vec<Bar> {
        let mut rng = self.rng_for(symbol, timeframe);
        let mut price: f64 = rng.gen_range(50.0..150.0);
        let mut drift = 0.0;
        let vol = self.volatility.max(f64::EPSILON);

        self.timestamps(timeframe, count)
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| {
                if i % REGIME_LENGTH == 0 {
                    drift = rng.gen_range(-0.002..0.002);
                }

                let bar_return = drift + rng.gen_range(-vol..vol);
                let open = price;
                let close = (price * (1.0 + bar_return)).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol / 2.0));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol / 2.0));

                let mut volume = rng.gen_range(500_000.0..5_000_000.0);
                if rng.gen_bool(0.05) {
                    volume *= 3.0;
                }

                price = close;
                Bar::new(timestamp, open, high, low, close, volume)
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for SyntheticMarketData {
    async fn bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Bar>, DataError> {
        Ok(self.generate(symbol, timeframe, limit))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// FNV-1a, used to give each symbol its own stream.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}
