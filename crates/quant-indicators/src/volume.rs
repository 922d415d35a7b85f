//! Volume-weighted indicators.

use quant_core::traits::BarIndicator;
use quant_core::types::Bar;
use serde::{Deserialize, Serialize};

use crate::simd::sum_simd;

/// Volume Weighted Average Price, cumulative from the first bar.
#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl Vwap {
    pub fn new() -> Self {
        Self
    }
}

impl BarIndicator for Vwap {
    type Output = f64;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        let mut cum_pv = 0.0;
        let mut cum_volume = 0.0;

        bars.iter()
            .map(|bar| {
                let typical = bar.typical_price();
                cum_pv += typical * bar.volume;
                cum_volume += bar.volume;
                if cum_volume > 0.0 {
                    cum_pv / cum_volume
                } else {
                    typical
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "VWAP"
    }
}

/// One bar's volume relative to its recent history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfileOutput {
    /// Current volume over the trailing average
    pub ratio: f64,
    pub average: f64,
    pub is_high_volume: bool,
}

/// Volume ratio against the average of the preceding `period` bars.
#[derive(Debug, Clone)]
pub struct VolumeProfile {
    period: usize,
    high_volume_threshold: f64,
}

impl VolumeProfile {
    pub fn new(period: usize, high_volume_threshold: f64) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            high_volume_threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.high_volume_threshold
    }
}

impl Default for VolumeProfile {
    fn default() -> Self {
        Self::new(20, 2.5)
    }
}

impl BarIndicator for VolumeProfile {
    type Output = VolumeProfileOutput;

    fn calculate(&self, bars: &[Bar]) -> Vec<VolumeProfileOutput> {
        if bars.len() < self.period() {
            return vec![];
        }

        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let period_f64 = self.period as f64;

        (self.period..volumes.len())
            .map(|i| {
                let average = sum_simd(&volumes[i - self.period..i]) / period_f64;
                let ratio = if average > 0.0 {
                    volumes[i] / average
                } else {
                    0.0
                };
                VolumeProfileOutput {
                    ratio,
                    average,
                    is_high_volume: ratio >= self.high_volume_threshold,
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "Volume Profile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, price: f64, volume: f64) -> Bar {
        Bar::new(ts, price, price, price, price, volume)
    }

    #[test]
    fn test_vwap_cumulative() {
        let bars = vec![bar(0, 10.0, 100.0), bar(1, 20.0, 300.0)];
        let result = Vwap::new().calculate(&bars);

        assert_eq!(result.len(), 2);
        assert!((result[0] - 10.0).abs() < 1e-12);
        assert!((result[1] - 17.5).abs() < 1e-12);
    }

    #[test]
    fn test_vwap_zero_volume_uses_typical_price() {
        let bars = vec![bar(0, 10.0, 0.0), bar(1, 12.0, 0.0)];
        assert_eq!(Vwap::new().calculate(&bars), vec![10.0, 12.0]);
        assert!(Vwap::new().calculate(&[]).is_empty());
    }

    #[test]
    fn test_volume_spike() {
        let mut bars: Vec<Bar> = (0..20).map(|i| bar(i, 100.0, 1000.0)).collect();
        bars.push(bar(20, 100.0, 3000.0));

        let profile = VolumeProfile::default();
        let result = profile.calculate(&bars);

        assert_eq!(result.len(), 1);
        assert!((result[0].ratio - 3.0).abs() < 1e-12);
        assert!(result[0].is_high_volume);
    }

    #[test]
    fn test_volume_profile_zero_average() {
        let mut bars: Vec<Bar> = (0..3).map(|i| bar(i, 100.0, 0.0)).collect();
        bars.push(bar(3, 100.0, 500.0));

        let result = VolumeProfile::new(3, 2.5).calculate(&bars);
        assert_eq!(result[0].ratio, 0.0);
        assert!(!result[0].is_high_volume);
        assert!(VolumeProfile::new(3, 2.5).calculate(&bars[..3]).is_empty());
    }
}
