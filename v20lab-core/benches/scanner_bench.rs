//! Criterion benchmarks for the v20 hot paths.
//!
//! Benchmarks:
//! 1. Setup scan over a full series
//! 2. Per-instrument simulation (rescans from the cursor each iteration)
//! 3. SMA attachment for the V200 filter

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use v20lab_core::{find_setups, simulate, Bar, PriceSeries, SourceCategory, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

/// Oscillating series with alternating bullish stretches and pullbacks, so
/// setups, entries, and exits all occur.
fn make_series(n: usize) -> PriceSeries {
    let base_date = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let bars = (0..n)
        .map(|i| {
            let wave = (i as f64 * 0.15).sin();
            let mid = 100.0 + wave * 30.0;
            let bullish = (i / 4) % 2 == 0;
            let (open, close) = if bullish {
                (mid - 2.0, mid + 2.0)
            } else {
                (mid + 2.0, mid - 2.0)
            };
            Bar::new(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.5,
                open.min(close) - 1.5,
                close,
            )
        })
        .collect();
    PriceSeries::new("BENCH", bars).expect("generated dates are increasing")
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_setups");
    for n in [1_000usize, 5_000, 20_000] {
        let series = make_series(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &series, |b, s| {
            b.iter(|| find_setups(black_box(s), 0.05, 0))
        });
    }
    group.finish();
}

fn bench_simulate(c: &mut Criterion) {
    let config = StrategyConfig {
        threshold_pct: 0.05,
        moving_average_period: 50,
        ..StrategyConfig::default()
    };
    let mut group = c.benchmark_group("simulate");
    for n in [1_000usize, 5_000, 20_000] {
        let series = make_series(n)
            .with_moving_average(config.moving_average_period)
            .expect("period is non-zero");
        for category in [SourceCategory::V40, SourceCategory::V200] {
            let id = BenchmarkId::new(category.label().to_string(), n);
            group.bench_with_input(id, &series, |b, s| {
                b.iter(|| simulate(black_box(s), "BENCH", &category, &config))
            });
        }
    }
    group.finish();
}

fn bench_moving_average(c: &mut Criterion) {
    let series = make_series(20_000);
    c.bench_function("sma_200_attach_20k", |b| {
        b.iter(|| black_box(series.clone()).with_moving_average(200))
    });
}

criterion_group!(benches, bench_scan, bench_simulate, bench_moving_average);
criterion_main!(benches);
