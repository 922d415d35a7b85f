//! Rolling support and resistance levels.

use quant_core::traits::BarIndicator;
use quant_core::types::Bar;
use serde::{Deserialize, Serialize};

use crate::simd::minmax_simd;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportResistanceOutput {
    /// Lowest low in the window
    pub support: f64,
    /// Highest high in the window
    pub resistance: f64,
    /// Where the latest close sits in the range, 0 at support and 1 at resistance.
    pub position: f64,
}

impl SupportResistanceOutput {
    pub fn range(&self) -> f64 {
        self.resistance - self.support
    }
}

#[derive(Debug, Clone)]
pub struct SupportResistance {
    lookback: usize,
}

impl SupportResistance {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback > 0, "Lookback must be greater than 0");
        Self { lookback }
    }
}

impl Default for SupportResistance {
    fn default() -> Self {
        Self::new(20)
    }
}

impl BarIndicator for SupportResistance {
    type Output = SupportResistanceOutput;

    fn calculate(&self, bars: &[Bar]) -> Vec<SupportResistanceOutput> {
        if bars.len() < self.lookback {
            return vec![];
        }

        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();

        (self.lookback..=bars.len())
            .filter_map(|end| {
                let start = end - self.lookback;
                let (support, _) = minmax_simd(&lows[start..end])?;
                let (_, resistance) = minmax_simd(&highs[start..end])?;
                let close = bars[end - 1].close;
                let range = resistance - support;
                let position = if range > 0.0 {
                    ((close - support) / range).clamp(0.0, 1.0)
                } else {
                    0.5
                };
                Some(SupportResistanceOutput {
                    support,
                    resistance,
                    position,
                })
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.lookback
    }

    fn name(&self) -> &str {
        "Support/Resistance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_levels() {
        let bars = vec![
            Bar::new(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            Bar::new(1, 10.0, 13.0, 10.0, 12.0, 1.0),
            Bar::new(2, 12.0, 12.5, 8.0, 9.0, 1.0),
            Bar::new(3, 9.0, 10.0, 8.5, 9.5, 1.0),
        ];

        let result = SupportResistance::new(3).calculate(&bars);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].support, 8.0);
        assert_eq!(result[0].resistance, 13.0);
        assert!((result[0].position - 0.2).abs() < 1e-12);
        assert_eq!(result[1].resistance, 13.0);
    }

    #[test]
    fn test_flat_range_is_midpoint() {
        let bars: Vec<Bar> = (0..5).map(|i| Bar::new(i, 5.0, 5.0, 5.0, 5.0, 1.0)).collect();
        let result = SupportResistance::new(5).calculate(&bars);
        assert_eq!(result[0].position, 0.5);
        assert!(SupportResistance::new(6).calculate(&bars).is_empty());
    }
}
