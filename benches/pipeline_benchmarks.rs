//! Benchmarks for the cycle-detection pipeline
//!
//! Covers:
//! - The wavelet decomposition (dominant cost, scales with series length)
//! - Band-pass tracking and Hilbert-based forecasting
//! - Full runs at each stop stage

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rhythmo::{Parameters, Pipeline, RawSeries, StopStage};
use std::f64::consts::PI;

/// Generate `days` of hourly samples of a noisy 30-day sinusoid
fn generate_input(days: usize) -> RawSeries {
    let hour = 3_600_000i64;
    let n = (days * 24) as i64;
    let timestamps: Vec<i64> = (0..n).map(|i| i * hour).collect();
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let t_days = i as f64 / 24.0;
            // Deterministic pseudo-noise for reproducibility
            let noise = (17.3 * i as f64).sin();
            10.0 * (2.0 * PI * t_days / 30.0).sin() + noise
        })
        .collect();
    RawSeries::new("bench", timestamps, values)
}

fn daily_params() -> Parameters {
    Parameters {
        data_resampling_rate: "1D".to_string(),
        cycle_selection_method: "power".to_string(),
        ..Parameters::default()
    }
}

fn bench_decomposition(c: &mut Criterion) {
    let mut group = c.benchmark_group("decomposition");
    let pipeline = Pipeline::new(daily_params());
    for days in [200, 400, 800] {
        let input = generate_input(days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &input, |b, input| {
            b.iter(|| pipeline.run(black_box(input), StopStage::Decompose));
        });
    }
    group.finish();
}

fn bench_stop_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stop_stages");
    let pipeline = Pipeline::new(daily_params());
    let input = generate_input(400);
    for (name, stage) in [
        ("track", StopStage::Track),
        ("forecast", StopStage::Forecast),
        ("schedule", StopStage::Schedule),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| pipeline.run(black_box(&input), stage));
        });
    }
    group.finish();
}

fn bench_selection_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection_methods");
    let input = generate_input(400);
    for method in [
        "prominence",
        "prominence_width",
        "relative_power",
        "power",
        "minimum_error",
    ] {
        let params = Parameters {
            cycle_selection_method: method.to_string(),
            ..daily_params()
        };
        let pipeline = Pipeline::new(params);
        group.bench_function(method, |b| {
            b.iter(|| pipeline.run(black_box(&input), StopStage::Track));
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    let pipeline = Pipeline::new(daily_params());
    let inputs: Vec<RawSeries> = (0..8).map(|_| generate_input(400)).collect();
    group.bench_function("eight_inputs", |b| {
        b.iter(|| pipeline.run_batch(black_box(&inputs), StopStage::Schedule));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decomposition,
    bench_stop_stages,
    bench_selection_methods,
    bench_batch
);
criterion_main!(benches);
