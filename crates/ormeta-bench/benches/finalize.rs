//! Resolution benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ormeta_bench::fixtures::{generate_schema, Scale};
use ormeta_bench::harness::{init_tracing, registered};
use ormeta_core::MetadataGraph;

fn bench_finalize(c: &mut Criterion) {
    init_tracing();
    let mut group = c.benchmark_group("finalize");

    for &scale in &[Scale::Tiny, Scale::Small, Scale::Medium] {
        let name = format!("{:?}", scale);
        group.bench_with_input(BenchmarkId::new("full", &name), &scale, |b, &scale| {
            b.iter_batched(
                || registered(scale),
                |mut graph| black_box(graph.finalize().unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("register");

    let schemas = generate_schema(Scale::Medium);
    group.bench_function("medium", |b| {
        b.iter(|| {
            let mut graph = MetadataGraph::new();
            graph.register_all(schemas.iter().cloned()).unwrap();
            black_box(graph);
        });
    });

    group.finish();
}

fn bench_refinalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    let mut graph = registered(Scale::Medium);
    graph.finalize().unwrap();
    group.bench_function("frozen", |b| {
        b.iter(|| black_box(graph.finalize().unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_finalize, bench_register, bench_refinalize);
criterion_main!(benches);
