//! Criterion benchmarks for ConfirmLab hot paths.
//!
//! Benchmarks:
//! 1. Confirmation loop on series with many rejections
//! 2. Roving controller over long follow-up
//! 3. Relapse window classification

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use confirmlab_core::{
    Baseline, Measurement, ProgressionDetector, RelapseWindowClassifier,
    RovingBaselineController, RovingPolicy, SubjectId, SubjectSeries, WorkingSeries,
};

// ── Helpers ──────────────────────────────────────────────────────────

/// Oscillating scores: spikes that fall back, so most candidates get rejected.
fn make_measurements(n: usize) -> Vec<Measurement> {
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let value = if i % 2 == 1 { 3.5 } else { 1.5 + (i as f64 * 0.01).sin().abs() * 0.5 };
            Measurement::new(base + Duration::days(i as i64 * 60), value)
        })
        .collect()
}

fn bench_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("detector");
    for n in [16usize, 128, 1024] {
        let ms = make_measurements(n);
        let baseline = Baseline::from(ms[0]);
        let det = ProgressionDetector::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &ms, |b, ms| {
            b.iter(|| {
                let mut ws = WorkingSeries::from_measurements(ms);
                black_box(det.detect(&mut ws, baseline).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_roving(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    // staircase: every fourth visit steps up a full point
    let ms: Vec<Measurement> = (0..400)
        .map(|i| Measurement::new(base + Duration::days(i * 90), (i / 4) as f64 * 1.0))
        .collect();
    let series = SubjectSeries::new(SubjectId::from("bench"), ms);
    let baseline = Baseline::from(*series.first().unwrap());
    let ctl = RovingBaselineController::new(
        ProgressionDetector::default(),
        RovingPolicy::Roving { track_all: true },
    );
    c.bench_function("roving_staircase_400", |b| {
        b.iter(|| black_box(ctl.run(&series, baseline).unwrap()))
    });
}

fn bench_classifier(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let relapses: Vec<NaiveDate> = (0..200).map(|i| base + Duration::days(i * 45)).collect();
    let classifier = RelapseWindowClassifier::default();
    c.bench_function("classify_200_relapses", |b| {
        b.iter(|| black_box(classifier.classify(base + Duration::days(4000), &relapses)))
    });
}

criterion_group!(benches, bench_detector, bench_roving, bench_classifier);
criterion_main!(benches);
