//! Classifier throughput
//!
//! Classification runs on every request before any I/O, so it should stay
//! in the microsecond range even for long queries.

use criterion::{Criterion, criterion_group, criterion_main};
use nutriroute::classifier::classify;
use std::hint::black_box;

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    group.bench_function("tier1_phrase", |b| {
        b.iter(|| classify(black_box("how do I change my password")))
    });

    group.bench_function("tier2_phrase", |b| {
        b.iter(|| classify(black_box("what did I eat for breakfast yesterday")))
    });

    group.bench_function("fallback_scoring", |b| {
        b.iter(|| classify(black_box("is chicken a good source of lean nutrition")))
    });

    let long_query = "tell me about my meals and calories and protein ".repeat(40);
    group.bench_function("long_query", |b| b.iter(|| classify(black_box(&long_query))));

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
