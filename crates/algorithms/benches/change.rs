//! Benchmarks for the change-detection hot path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use urbdiff_algorithms::imagery::{index_difference, ndbi, threshold_masks, ChangeThresholds};
use urbdiff_algorithms::vector::{vectorize_mask, VectorizeParams};
use urbdiff_core::{GeoTransform, Raster};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 100) as f64 / 100.0;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_ndbi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndbi");
    for size in [256, 512, 1024] {
        let swir = create_band(size, 0.3);
        let nir = create_band(size, 0.1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndbi(black_box(&swir), black_box(&nir)).unwrap())
        });
    }
    group.finish();
}

fn bench_change_masks(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/change_masks");
    for size in [256, 512, 1024] {
        let before = create_band(size, 0.0);
        let after = create_band(size, 0.15);
        let change = index_difference(&before, &after).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| threshold_masks(black_box(&change), ChangeThresholds::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector/vectorize");
    for size in [128, 256, 512] {
        let mut mask = Raster::filled(size, size, f64::NAN);
        mask.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
        mask.set_nodata(Some(f64::NAN));
        // Scatter rectangular blobs across the mask
        for block in 0..(size / 16) {
            let r0 = block * 16;
            for row in r0..(r0 + 8).min(size) {
                for col in r0..(r0 + 8).min(size) {
                    mask.set(row, col, 1.0).unwrap();
                }
            }
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| vectorize_mask(black_box(&mask), &VectorizeParams::default()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndbi, bench_change_masks, bench_vectorize);
criterion_main!(benches);
