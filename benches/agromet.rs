use agromet::{Observation, ObservationSeries, QualityControl, VariableCategory};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_series(n: usize, offset_minutes: i64) -> ObservationSeries {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ObservationSeries::from_observations(
        (0..n)
            .map(|i| {
                let ts = base + chrono::Duration::minutes(offset_minutes + 15 * i as i64);
                let value = 12.0 + ((i % 96) as f64) * 0.1;
                Observation::new(ts, Some(value))
            })
            .collect(),
    )
}

fn bench_agromet(c: &mut Criterion) {
    let cached = sample_series(50_000, 0);
    let fetched = sample_series(50_000, 15 * 25_000);
    c.bench_function("series_merge", |b| {
        b.iter(|| black_box(&cached).merge(black_box(&fetched)))
    });

    let qc = QualityControl::default();
    c.bench_function("qc_apply_all_checks", |b| {
        b.iter(|| qc.apply_all_checks(black_box(&cached), VariableCategory::Temperature))
    });
}

criterion_group!(benches, bench_agromet);
criterion_main!(benches);
