//! Polygon validation and overlap benchmarks at realistic vertex counts.
//!
//! Run with: `cargo bench -p claim_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use claim_core::geo::LatLon;
use claim_core::geometry;
use claim_core::ids::OwnerId;
use claim_core::territory::TerritoryRegistry;
use claim_test_utils::fixtures::{dense_walk, square};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Closed outline of a `side` meter square sampled every `step_m` meters.
fn outline(x: f64, side: f64, step_m: f64) -> Vec<LatLon> {
    dense_walk(&square(x, 0.0, side), step_m, 0)
        .iter()
        .map(|fix| fix.position())
        .collect()
}

pub fn simplicity_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_simple");
    for vertices in [64usize, 500, 2000] {
        let polygon = outline(0.0, 1000.0, 4000.0 / vertices as f64);
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &polygon, |b, p| {
            b.iter(|| geometry::is_simple(black_box(p)));
        });
    }
    group.finish();
}

pub fn intersection_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersects");
    for vertices in [64usize, 500, 2000] {
        let step = 4000.0 / vertices as f64;
        let a = outline(0.0, 1000.0, step);
        // Touching along one edge: the slowest case, no early exit
        let b = outline(1000.0, 1000.0, step);
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &(a, b), |bench, (a, b)| {
            bench.iter(|| geometry::intersects(black_box(a), black_box(b)));
        });
    }
    group.finish();
}

pub fn commit_benchmark(c: &mut Criterion) {
    // A 20 x 20 grid of claims already in place
    let registry = TerritoryRegistry::default();
    for i in 0..400u32 {
        let (col, row) = (f64::from(i % 20), f64::from(i / 20));
        registry
            .commit(OwnerId::new(u64::from(i)), square(col * 60.0, row * 60.0, 50.0), 0)
            .expect("grid cells are disjoint");
    }
    // Overlaps only the newest cell, so every existing territory is checked
    let candidate = square(1150.0, 1150.0, 20.0);

    c.bench_function("commit_rejected_after_400", |b| {
        b.iter(|| {
            let result = registry.commit(OwnerId::new(9999), black_box(candidate.clone()), 0);
            black_box(result.is_err())
        });
    });
}

criterion_group!(benches, simplicity_benchmark, intersection_benchmark, commit_benchmark);
criterion_main!(benches);
