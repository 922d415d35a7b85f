//! Hand-shaped bar sequences with known indicator readings.
//!
//! Daily bars starting 2024-01-01 UTC. Each bar opens at its close with a
//! fixed high/low spread, so true range and band readings stay predictable.

use quant_core::types::Bar;

/// 2024-01-01T00:00:00Z
pub const SCENARIO_START_MS: i64 = 1_704_067_200_000;
const DAY_MS: i64 = 86_400_000;
const BASE_VOLUME: f64 = 1_000.0;

/// Builds a scenario one close at a time.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    bars: Vec<Bar>,
    spread: f64,
}

impl ScenarioBuilder {
    pub fn new(spread: f64) -> Self {
        Self {
            bars: Vec::new(),
            spread: spread.abs(),
        }
    }

    pub fn push(mut self, close: f64, volume: f64) -> Self {
        let ts = SCENARIO_START_MS + self.bars.len() as i64 * DAY_MS;
        self.bars.push(Bar::new(
            ts,
            close,
            close + self.spread,
            close - self.spread,
            close,
            volume,
        ));
        self
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn build(self) -> Vec<Bar> {
        self.bars
    }
}

/// Closes alternating between 100.0 and 100.2 on flat volume.
pub fn quiet_market(count: usize) -> Vec<Bar> {
    quiet(count).build()
}

fn quiet(count: usize) -> ScenarioBuilder {
    (0..count).fold(ScenarioBuilder::new(0.5), |b, i| {
        b.push(100.0 + 0.2 * (i % 2) as f64, BASE_VOLUME)
    })
}

/// Five 2-point drops after a quiet stretch, the last on triple volume.
///
/// Ends with RSI below 10, the close under the lower Bollinger band and a
/// volume ratio of 3.
pub fn oversold_capitulation() -> Vec<Bar> {
    shock(-2.0)
}

/// Mirror of [`oversold_capitulation`]: five 2-point rallies.
pub fn overbought_blowoff() -> Vec<Bar> {
    shock(2.0)
}

fn shock(step: f64) -> Vec<Bar> {
    (1..=5)
        .fold(quiet(25), |b, k| {
            let volume = if k == 5 { 3.0 * BASE_VOLUME } else { BASE_VOLUME };
            b.push(100.0 + step * k as f64, volume)
        })
        .build()
}

/// A steady grind higher, then a close 4 points above the prior high on
/// triple volume.
pub fn breakout() -> Vec<Bar> {
    range_break(1.0)
}

/// Mirror of [`breakout`].
pub fn breakdown() -> Vec<Bar> {
    range_break(-1.0)
}

fn range_break(sign: f64) -> Vec<Bar> {
    let mut builder = ScenarioBuilder::new(0.3);
    let mut close = 100.0;
    for i in 0..40 {
        close += sign * if i % 2 == 0 { 0.3 } else { -0.15 };
        builder = builder.push(close, BASE_VOLUME);
    }
    builder.push(close + sign * 4.0, 3.0 * BASE_VOLUME).build()
}

/// 30 bars of decline followed by 15 bars of recovery.
///
/// The 9/21 EMA pair crosses up on bar 38.
pub fn bullish_reversal() -> Vec<Bar> {
    reversal(1.0)
}

/// Mirror of [`bullish_reversal`].
pub fn bearish_reversal() -> Vec<Bar> {
    reversal(-1.0)
}

fn reversal(sign: f64) -> Vec<Bar> {
    let mut builder = ScenarioBuilder::new(0.5);
    let mut close = 100.0;
    for i in 0..30 {
        close -= sign * if i % 2 == 0 { 0.4 } else { -0.1 };
        builder = builder.push(close, BASE_VOLUME);
    }
    for i in 0..15 {
        close += sign * if i % 2 == 0 { 0.8 } else { -0.2 };
        builder = builder.push(close, 1.5 * BASE_VOLUME);
    }
    builder.build()
}

/// Closes following `path`, on flat volume with a 0.5 spread.
pub fn from_closes(path: &[f64]) -> Vec<Bar> {
    path.iter()
        .fold(ScenarioBuilder::new(0.5), |b, &c| b.push(c, BASE_VOLUME))
        .build()
}
