//! Volatility indicators.

use quant_core::traits::{BarIndicator, Indicator, MultiOutputIndicator};
use quant_core::types::Bar;
use serde::{Deserialize, Serialize};

use crate::simd::{mean_simd, sum_simd, sum_sq_dev_simd};

/// Rolling population standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for StdDev {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = sum_simd(window) / period_f64;
                (sum_sq_dev_simd(window, mean) / period_f64).sqrt()
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Average True Range with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::new(14)
    }
}

impl BarIndicator for Atr {
    type Output = f64;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        if bars.len() < self.period() {
            return vec![];
        }

        let tr: Vec<f64> = bars
            .windows(2)
            .map(|w| w[1].true_range(Some(w[0].close)))
            .collect();

        let period_f64 = self.period as f64;
        let mut result = Vec::with_capacity(tr.len() - self.period + 1);

        let mut atr = sum_simd(&tr[..self.period]) / period_f64;
        result.push(atr);

        for &tr_val in &tr[self.period..] {
            atr = (atr * (period_f64 - 1.0) + tr_val) / period_f64;
            result.push(atr);
        }

        result
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// Rolling mean
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
    /// (price - lower) / (upper - lower)
    pub percent_b: f64,
}

impl BollingerOutput {
    /// Price at or below the lower band, with a relative tolerance.
    pub fn touches_lower(&self, price: f64, tolerance: f64) -> bool {
        price <= self.lower * (1.0 + tolerance)
    }

    /// Price at or above the upper band, with a relative tolerance.
    pub fn touches_upper(&self, price: f64, tolerance: f64) -> bool {
        price >= self.upper * (1.0 - tolerance)
    }
}

/// Bollinger Bands: mean ± k population standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    /// Default parameters (20, 2.0).
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(
            std_dev_multiplier > 0.0,
            "Std dev multiplier must be positive"
        );
        Self {
            period,
            std_dev_multiplier,
        }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiOutputIndicator for BollingerBands {
    type Outputs = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        if data.len() < self.period {
            return vec![];
        }

        data.windows(self.period)
            .map(|window| {
                let mean = mean_simd(window).unwrap_or_default();
                let std_dev = (sum_sq_dev_simd(window, mean) / self.period as f64).sqrt();
                let offset = self.std_dev_multiplier * std_dev;

                let upper = mean + offset;
                let lower = mean - offset;
                let price = window[window.len() - 1];

                let bandwidth = if mean != 0.0 {
                    (upper - lower) / mean
                } else {
                    0.0
                };
                let percent_b = if upper > lower {
                    (price - lower) / (upper - lower)
                } else {
                    0.5
                };

                BollingerOutput {
                    upper,
                    middle: mean,
                    lower,
                    bandwidth,
                    percent_b,
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_std_dev() {
        let std_dev = StdDev::new(3);
        let result = std_dev.calculate(&[2.0, 4.0, 6.0, 8.0, 10.0]);

        assert_eq!(result.len(), 3);
        // [2, 4, 6]: variance 8/3
        assert!((result[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_atr_wilder_smoothing() {
        let atr = Atr::new(3);
        let bars = vec![
            Bar::new(0, 9.0, 10.0, 8.0, 9.0, 1.0),
            Bar::new(1, 9.0, 11.0, 9.0, 10.0, 1.0),  // TR 2
            Bar::new(2, 10.0, 12.0, 10.0, 11.0, 1.0), // TR 2
            Bar::new(3, 11.0, 11.0, 9.0, 10.0, 1.0),  // TR 2
            Bar::new(4, 10.0, 14.0, 10.0, 13.0, 1.0), // TR 4
        ];

        let result = atr.calculate(&bars);
        assert_eq!(result.len(), bars.len() - atr.period() + 1);
        assert!((result[0] - 2.0).abs() < 1e-12);
        assert!((result[1] - (2.0 * 2.0 + 4.0) / 3.0).abs() < 1e-12);
        assert!(atr.calculate(&bars[..3]).is_empty());
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let bb = BollingerBands::new();
        let data: Vec<f64> = (0..30)
            .map(|i| 100.0 + (i as f64 * 0.1).sin() * 5.0)
            .collect();

        let result = bb.calculate(&data);
        assert_eq!(result.len(), 11);
        for output in &result {
            assert!(output.upper > output.middle);
            assert!(output.middle > output.lower);
            assert!(output.bandwidth > 0.0);
        }
    }

    #[test]
    fn test_bollinger_flat_prices() {
        let bb = BollingerBands::with_params(5, 2.0);
        let result = bb.calculate(&[100.0; 5]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].upper, result[0].lower);
        assert!((result[0].percent_b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_band_touches() {
        let output = BollingerOutput {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
            bandwidth: 0.2,
            percent_b: 0.5,
        };

        assert!(output.touches_lower(90.2, 0.005));
        assert!(!output.touches_lower(95.0, 0.005));
        assert!(output.touches_upper(109.9, 0.005));
        assert!(!output.touches_upper(105.0, 0.005));
    }

    proptest! {
        #[test]
        fn bollinger_bands_are_ordered(prices in prop::collection::vec(0.01f64..10_000.0, 20..100), k in 0.5f64..4.0) {
            let bands = BollingerBands::with_params(20, k).calculate(&prices);
            prop_assert_eq!(bands.len(), prices.len() - 19);
            for b in bands {
                prop_assert!(b.lower <= b.middle);
                prop_assert!(b.middle <= b.upper);
            }
        }
    }
}
