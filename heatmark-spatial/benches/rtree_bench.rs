//! R-Tree benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use heatmark_spatial::{BoundingBox, RTree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_boxes(count: usize) -> Vec<(BoundingBox, u64)> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let x = rng.gen_range(0.0..1000.0);
            let y = rng.gen_range(0.0..1000.0);
            let w = rng.gen_range(0.5..10.0);
            let h = rng.gen_range(0.5..10.0);
            (BoundingBox::new(x, y, x + w, y + h), i as u64)
        })
        .collect()
}

fn bench_rtree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Insert");

    for size in [100, 1000, 10000].iter() {
        let boxes = random_boxes(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut tree = RTree::new();
                for (bbox, id) in &boxes {
                    tree.insert(*bbox, *id).unwrap();
                }
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

fn bench_rtree_bulk_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Bulk Load");

    for size in [100, 1000, 10000].iter() {
        let boxes = random_boxes(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(RTree::bulk_load(&boxes).unwrap().len()));
        });
    }

    group.finish();
}

fn bench_rtree_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTree Search");

    let boxes = random_boxes(10000);
    let tree = RTree::bulk_load(&boxes).unwrap();

    group.bench_function("search_10k", |b| {
        b.iter(|| {
            let query = BoundingBox::new(250.0, 250.0, 750.0, 750.0);
            black_box(tree.search(&query))
        });
    });

    group.bench_function("nearest_10k", |b| {
        b.iter(|| black_box(tree.nearest(500.0, 500.0, f64::MAX, Some(10))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_rtree_insert,
    bench_rtree_bulk_load,
    bench_rtree_search
);
criterion_main!(benches);
