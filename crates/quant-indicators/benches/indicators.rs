//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quant_core::traits::{BarIndicator, Indicator, MultiOutputIndicator};
use quant_core::types::Bar;
use quant_indicators::{Atr, BollingerBands, Ema, Macd, Rsi, Sma, VolumeProfile, Vwap};

const SIZES: [usize; 3] = [1_000, 10_000, 100_000];

fn generate_closes(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn generate_bars(size: usize) -> Vec<Bar> {
    generate_closes(size)
        .into_iter()
        .enumerate()
        .map(|(i, close)| {
            let volume = 1_000.0 + (i % 17) as f64 * 150.0;
            Bar::new(i as i64 * 60_000, close, close + 0.8, close - 0.8, close, volume)
        })
        .collect()
}

fn benchmark_moving_averages(c: &mut Criterion) {
    let mut group = c.benchmark_group("MovingAverage");

    for size in SIZES {
        let data = generate_closes(size);

        group.bench_with_input(BenchmarkId::new("sma", size), &data, |b, data| {
            let sma = Sma::new(20);
            b.iter(|| sma.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("ema", size), &data, |b, data| {
            let ema = Ema::new(20);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_oscillators(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillators");

    for size in SIZES {
        let data = generate_closes(size);

        group.bench_with_input(BenchmarkId::new("rsi", size), &data, |b, data| {
            let rsi = Rsi::new(14);
            b.iter(|| rsi.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("macd", size), &data, |b, data| {
            let macd = Macd::new();
            b.iter(|| macd.calculate(black_box(data)))
        });

        group.bench_with_input(BenchmarkId::new("bollinger", size), &data, |b, data| {
            let bb = BollingerBands::new();
            b.iter(|| bb.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_bar_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("BarIndicators");

    for size in SIZES {
        let bars = generate_bars(size);

        group.bench_with_input(BenchmarkId::new("atr", size), &bars, |b, bars| {
            let atr = Atr::new(14);
            b.iter(|| atr.calculate(black_box(bars)))
        });

        group.bench_with_input(BenchmarkId::new("vwap", size), &bars, |b, bars| {
            b.iter(|| Vwap::new().calculate(black_box(bars)))
        });

        group.bench_with_input(BenchmarkId::new("volume_profile", size), &bars, |b, bars| {
            let profile = VolumeProfile::default();
            b.iter(|| profile.calculate(black_box(bars)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_moving_averages,
    benchmark_oscillators,
    benchmark_bar_indicators
);
criterion_main!(benches);
