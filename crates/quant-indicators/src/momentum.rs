//! Momentum indicators.

use quant_core::traits::{Indicator, MultiOutputIndicator};
use serde::{Deserialize, Serialize};

use crate::moving_average::ema_series;
use crate::simd::{gains_losses_simd, sum_simd};

/// Stand-in for a zero average loss.
const RSI_EPSILON: f64 = 1e-10;

/// Relative Strength Index with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    fn value(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_gain == 0.0 && avg_loss == 0.0 {
            // Flat window
            return 50.0;
        }
        let loss = if avg_loss == 0.0 { RSI_EPSILON } else { avg_loss };
        let rsi = 100.0 - 100.0 / (1.0 + avg_gain / loss);
        if rsi.is_finite() {
            rsi.clamp(0.0, 100.0)
        } else {
            50.0
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period() {
            return vec![];
        }

        let (gains, losses) = gains_losses_simd(data);
        let period_f64 = self.period as f64;

        let mut avg_gain = sum_simd(&gains[..self.period]) / period_f64;
        let mut avg_loss = sum_simd(&losses[..self.period]) / period_f64;

        let mut result = Vec::with_capacity(gains.len() - self.period + 1);
        result.push(Self::value(avg_gain, avg_loss));

        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (period_f64 - 1.0) + gains[i]) / period_f64;
            avg_loss = (avg_loss * (period_f64 - 1.0) + losses[i]) / period_f64;
            result.push(Self::value(avg_gain, avg_loss));
        }

        result
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA minus slow EMA
    pub macd: f64,
    /// EMA of the MACD line
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// Default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && slow > 0 && signal > 0);
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for Macd {
    type Outputs = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.period() {
            return vec![];
        }

        let fast_ema = ema_series(data, self.fast_period);
        let slow_ema = ema_series(data, self.slow_period);

        // Fast EMA starts earlier; align on the slow one
        let offset = self.slow_period - self.fast_period;
        let macd_line: Vec<f64> = fast_ema[offset..]
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = ema_series(&macd_line, self.signal_period);

        macd_line[self.signal_period - 1..]
            .iter()
            .zip(signal_line.iter())
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rsi_length_and_bounds() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..30)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0)
            .collect();

        let result = rsi.calculate(&data);
        assert_eq!(result.len(), data.len() - rsi.period() + 1);
        assert!(result.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_all_gains_uses_epsilon() {
        let rsi = Rsi::new(5);
        let result = rsi.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

        assert_eq!(result.len(), 2);
        assert!(result[0] <= 100.0);
        assert!((result[0] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_rsi_all_losses() {
        let rsi = Rsi::new(5);
        let result = rsi.calculate(&[7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(result[0].abs() < 1e-10);
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        let rsi = Rsi::new(5);
        let result = rsi.calculate(&[10.0; 8]);
        assert!(result.iter().all(|v| *v == 50.0));
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(Rsi::new(14).calculate(&[1.0; 14]).is_empty());
        assert_eq!(Rsi::new(14).calculate(&[1.0; 15]).len(), 1);
    }

    #[test]
    fn test_macd_uptrend() {
        let macd = Macd::new();
        let data: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let result = macd.calculate(&data);

        assert_eq!(result.len(), data.len() - macd.period() + 1);
        let last = result.last().unwrap();
        assert!(last.macd > 0.0);
        assert!((last.histogram - (last.macd - last.signal)).abs() < 1e-12);
    }

    #[test]
    fn test_macd_exact_warmup() {
        let macd = Macd::with_periods(5, 10, 3);
        let data: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        assert_eq!(macd.calculate(&data).len(), 1);
        assert!(macd.calculate(&data[..11]).is_empty());
    }

    proptest! {
        #[test]
        fn rsi_stays_within_bounds(prices in prop::collection::vec(0.01f64..10_000.0, 16..120)) {
            let values = Rsi::new(14).calculate(&prices);
            prop_assert_eq!(values.len(), prices.len() - 14);
            for v in values {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }
}
