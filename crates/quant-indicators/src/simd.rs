//! SIMD kernels shared by the indicators.
//!
//! Built on `wide::f64x4`; tails shorter than one lane are folded in scalar.

use wide::f64x4;

#[inline]
fn lane(data: &[f64], idx: usize) -> f64x4 {
    f64x4::new([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]])
}

/// Sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.len() / 4;
    let mut acc = f64x4::splat(0.0);

    for i in 0..chunks {
        acc += lane(data, i * 4);
    }

    let mut result = acc.reduce_add();
    for &value in &data[(chunks * 4)..] {
        result += value;
    }
    result
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean_simd(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(sum_simd(data) / data.len() as f64)
    }
}

/// Sum of squared deviations from `mean`.
pub fn sum_sq_dev_simd(data: &[f64], mean: f64) -> f64 {
    let chunks = data.len() / 4;
    let mean_vec = f64x4::splat(mean);
    let mut acc = f64x4::splat(0.0);

    for i in 0..chunks {
        let diff = lane(data, i * 4) - mean_vec;
        acc += diff * diff;
    }

    let mut result = acc.reduce_add();
    for &value in &data[(chunks * 4)..] {
        let diff = value - mean;
        result += diff * diff;
    }
    result
}

/// Population standard deviation of a window.
pub fn population_std_dev(window: &[f64]) -> f64 {
    match mean_simd(window) {
        Some(mean) => (sum_sq_dev_simd(window, mean) / window.len() as f64).sqrt(),
        None => 0.0,
    }
}

/// Split consecutive changes into gains and losses (both non-negative).
pub fn gains_losses_simd(data: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = data.len().saturating_sub(1);
    let mut gains = Vec::with_capacity(n);
    let mut losses = Vec::with_capacity(n);
    let zero = f64x4::splat(0.0);
    let chunks = n / 4;

    for i in 0..chunks {
        let idx = i * 4;
        let diff = lane(data, idx + 1) - lane(data, idx);
        gains.extend(diff.max(zero).to_array());
        losses.extend((-diff).max(zero).to_array());
    }

    for i in (chunks * 4)..n {
        let change = data[i + 1] - data[i];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    (gains, losses)
}

/// Minimum and maximum of a slice.
pub fn minmax_simd(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }

    let chunks = data.len() / 4;
    let mut min_vec = f64x4::splat(f64::INFINITY);
    let mut max_vec = f64x4::splat(f64::NEG_INFINITY);

    for i in 0..chunks {
        let values = lane(data, i * 4);
        min_vec = min_vec.min(values);
        max_vec = max_vec.max(values);
    }

    let mut min = min_vec.to_array().into_iter().fold(f64::INFINITY, f64::min);
    let mut max = max_vec.to_array().into_iter().fold(f64::NEG_INFINITY, f64::max);

    for &value in &data[(chunks * 4)..] {
        min = min.min(value);
        max = max.max(value);
    }

    Some((min, max))
}
