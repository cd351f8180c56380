//! Benchmarks for endpoint selection and threshold checks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;
use snipe_race::exit::ExitThresholds;
use snipe_race::race::{select_fastest, ProbeResult};
use snipe_race::rpc::Endpoint;
use std::time::Duration;

fn probe_results(n: usize) -> Vec<ProbeResult> {
    (0..n)
        .map(|i| ProbeResult {
            endpoint: Endpoint::new(format!("http://node-{i}")),
            // Every fifth endpoint is unreachable
            latency: (i % 5 != 0).then(|| Duration::from_micros(((i * 7919) % 1000) as u64)),
            height: Some(1),
        })
        .collect()
}

fn benchmark_select_fastest(c: &mut Criterion) {
    let small = probe_results(4);
    let large = probe_results(64);

    c.bench_function("select_fastest_4", |b| {
        b.iter(|| select_fastest(black_box(&small)))
    });
    c.bench_function("select_fastest_64", |b| {
        b.iter(|| select_fastest(black_box(&large)))
    });
}

fn benchmark_threshold_evaluate(c: &mut Criterion) {
    let thresholds = ExitThresholds::new(dec!(2.0), dec!(0.8)).unwrap();
    let reference = dec!(0.00012345);

    c.bench_function("thresholds_armed", |b| {
        b.iter(|| thresholds.evaluate(black_box(reference), black_box(dec!(0.00015))))
    });
    c.bench_function("thresholds_take_profit", |b| {
        b.iter(|| thresholds.evaluate(black_box(reference), black_box(dec!(0.0003))))
    });
}

criterion_group!(benches, benchmark_select_fastest, benchmark_threshold_evaluate);
criterion_main!(benches);
