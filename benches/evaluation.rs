//! Benchmarks for corpus evaluation

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rankeval::{EvalConfig, EvaluationRunner, MetricCatalog, RankGroup, TieResolver};
use std::hint::black_box;

/// Deterministic corpus: `groups` groups of `size` candidates with some ties
fn corpus(groups: usize, size: usize) -> Vec<RankGroup> {
    (0..groups)
        .map(|g| {
            let ranks: Vec<(f64, Option<f64>)> = (0..size)
                .map(|i| {
                    let gold = (i / 2 + 1) as f64;
                    let predicted = ((i * 7 + g) % size + 1) as f64;
                    (gold, Some(predicted))
                })
                .collect();
            RankGroup::from_ranks(format!("g{g}"), &ranks).unwrap()
        })
        .collect()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let resolver = TieResolver::default();

    for size in [5, 20, 100] {
        let groups = corpus(1, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &groups[0], |b, g| {
            b.iter(|| resolver.resolve(black_box(g)).concordance().concordant);
        });
    }

    group.finish();
}

fn bench_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");
    let config = EvalConfig::default();
    let groups = corpus(1, 20);
    let resolved = TieResolver::default().resolve(&groups[0]);

    let core = MetricCatalog::core(&config);
    group.bench_function("core_20", |b| {
        b.iter(|| core.evaluate(black_box(&resolved)));
    });

    let standard = MetricCatalog::standard(&config);
    group.bench_function("standard_20", |b| {
        b.iter(|| standard.evaluate(black_box(&resolved)));
    });

    group.finish();
}

fn bench_corpus(c: &mut Criterion) {
    let mut group = c.benchmark_group("corpus");
    let runner = EvaluationRunner::from_config(&EvalConfig::default()).unwrap();

    for groups in [100, 1000] {
        let data = corpus(groups, 5);
        group.bench_with_input(BenchmarkId::new("wmt_like", groups), &data, |b, data| {
            b.iter(|| runner.run(black_box(data)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_catalog, bench_corpus);
criterion_main!(benches);
