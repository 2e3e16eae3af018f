//! Storage service benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashSet;
use syncify_bench::linear_history;
use syncify_core::MAIN_BRANCH;
use syncify_storage::StorageService;
use syncify_testkit::{TestRestorer, TestState};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// Benchmark saving a whole workspace.
fn bench_save_workspace(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("save_workspace");

    for len in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let ws = linear_history(len);
            b.iter(|| {
                let service = StorageService::in_memory();
                rt.block_on(service.save_workspace(black_box(&ws))).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark loading and revalidating a whole workspace.
fn bench_load_workspace(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("load_workspace");

    for len in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let service = StorageService::from_workspace(&linear_history(len)).unwrap();
            b.iter(|| {
                let ws = rt
                    .block_on(service.load_workspace::<TestState>(&TestRestorer))
                    .unwrap();
                black_box(ws);
            });
        });
    }

    group.finish();
}

/// Benchmark serving a full fetch from storage.
fn bench_ancestry_snapshots(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("ancestry_snapshots");

    for len in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, &len| {
            let ws = linear_history(len);
            let head = ws.head_hash(MAIN_BRANCH).unwrap().clone();
            let service = StorageService::from_workspace(&ws).unwrap();
            let known = HashSet::new();
            b.iter(|| {
                let batch = rt
                    .block_on(service.ancestry_snapshots(black_box(&head), &known))
                    .unwrap();
                black_box(batch.len());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_save_workspace,
    bench_load_workspace,
    bench_ancestry_snapshots
);
criterion_main!(benches);
