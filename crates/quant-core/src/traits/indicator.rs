//! Indicator trait definitions.
//!
//! Every indicator declares a warm-up length via `period()`. Output series
//! are aligned to the tail of the input: for an input of `n` points the
//! output holds `n - period() + 1` values, or nothing when `n < period()`.

use crate::error::IndicatorError;
use crate::types::Bar;

/// Error unless `available` points cover a warm-up of `required`.
pub fn ensure_warmup(required: usize, available: usize) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData { required, available });
    }
    Ok(())
}

/// Indicator over a single price column (usually closes).
pub trait Indicator: Send + Sync {
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum number of input points (warm-up).
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    /// Most recent value, if the input covers the warm-up.
    fn latest(&self, data: &[f64]) -> Option<Self::Output> {
        self.calculate(data).pop()
    }

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        ensure_warmup(self.period(), data.len())
    }
}

/// Multi-output indicator (Bollinger Bands, MACD).
pub trait MultiOutputIndicator: Send + Sync {
    type Outputs;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Outputs>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn latest(&self, data: &[f64]) -> Option<Self::Outputs> {
        self.calculate(data).pop()
    }

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        ensure_warmup(self.period(), data.len())
    }
}

/// Indicator that needs whole bars (ranges, volume).
pub trait BarIndicator: Send + Sync {
    type Output;

    fn calculate(&self, bars: &[Bar]) -> Vec<Self::Output>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn latest(&self, bars: &[Bar]) -> Option<Self::Output> {
        self.calculate(bars).pop()
    }
}
