use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gen_jw_stats::series::Reading;
use gen_jw_stats::stats::{low_percentiles, non_zero_values};
use gen_jw_stats::streaks::detect_zero_streaks;

/// One month of quarter-hour readings with nightly outages and a few missing intervals
fn month_of_readings() -> Vec<Reading> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start date");

    (0..31 * 96)
        .filter(|i| i % 500 != 0)
        .map(|i| Reading {
            timestamp: start + Duration::minutes(15 * i as i64),
            value: if (i % 96) < 20 { 0.0 } else { 100.0 + (i % 37) as f64 },
        })
        .collect()
}

fn bench_zero_streaks(c: &mut Criterion) {
    let readings = month_of_readings();
    c.bench_function("detect_zero_streaks_month", |b| {
        b.iter(|| detect_zero_streaks(black_box(&readings)))
    });
}

fn bench_low_percentiles(c: &mut Criterion) {
    let readings = month_of_readings();
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let non_zero = non_zero_values(&values);
    c.bench_function("low_percentiles_month", |b| {
        b.iter(|| low_percentiles(black_box(&non_zero)))
    });
}

criterion_group!(benches, bench_zero_streaks, bench_low_percentiles);
criterion_main!(benches);
