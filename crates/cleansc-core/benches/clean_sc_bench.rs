//! CLEAN-SC Benchmarks
//!
//! Dirty-map formation across grid and array sizes, and full deconvolutions.
//!
//! Run with: cargo bench -p cleansc-core --bench clean_sc_bench
//! Parallel:  cargo bench -p cleansc-core --features parallel --bench clean_sc_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use cleansc_core::prelude::*;
use cleansc_core::synth::add_hermitian_noise;

/// Benchmark the O(N·M·P²) dirty map
fn bench_dirty_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("dirty_map");

    for (grid, mics) in [(16, 16), (32, 32), (64, 32), (64, 64)].iter() {
        let field = random_steering_field(*grid, *grid, *mics, 1);
        let csm = point_source_csm(&field, &[PointSource::new(grid / 2, grid / 3, 1.0)]);
        let weights = WeightVector::ones(*mics);

        group.throughput(Throughput::Elements((grid * grid) as u64));
        group.bench_with_input(
            BenchmarkId::new(format!("P{}", mics), format!("{}x{}", grid, grid)),
            &(field, csm, weights),
            |b, (field, csm, weights)| {
                b.iter(|| dirty_map(black_box(csm), black_box(field), black_box(weights)))
            },
        );
    }

    group.finish();
}

/// Benchmark complete deconvolutions of a three-source scene
fn bench_deconvolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("deconvolution");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for grid in [16, 32].iter() {
        let mics = 32;
        let field = random_steering_field(*grid, *grid, mics, 7);
        let mut csm = point_source_csm(
            &field,
            &[
                PointSource::new(grid / 4, grid / 4, 1.0),
                PointSource::new(grid / 2, 3 * grid / 4, 0.5),
                PointSource::new(3 * grid / 4, grid / 3, 0.25),
            ],
        );
        add_hermitian_noise(&mut csm, 0.01, 3);
        let weights = WeightVector::ones(mics);
        let engine = CleanSc::new();

        group.bench_with_input(
            BenchmarkId::new("clean_sc", format!("{}x{}", grid, grid)),
            &(field, csm, weights),
            |b, (field, csm, weights)| {
                b.iter(|| engine.deconvolve(black_box(csm), black_box(field), black_box(weights)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_dirty_map, bench_deconvolution);
criterion_main!(benches);
