//! Benchmarks for the per-pixel pipeline stages

use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rivice_algorithms::composite::mosaic;
use rivice_algorithms::imagery::{normalized_difference, Formula};
use rivice_algorithms::statistics::zonal_mean;
use rivice_core::scene::bands;
use rivice_core::{GeoTransform, Raster, RegionOfInterest, Scene};

fn create_band(size: usize, base: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64 / 1000.0;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_normalized_difference(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/normalized_difference");
    for size in [256, 512, 1024] {
        let green = create_band(size, 0.2);
        let nir = create_band(size, 0.05);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| normalized_difference(black_box(&green), black_box(&nir)).unwrap())
        });
    }
    group.finish();
}

fn bench_formula(c: &mut Criterion) {
    let rdri = Formula::parse("(red - nir) / (nir - swir)").unwrap();
    let mut group = c.benchmark_group("imagery/rdri_formula");
    for size in [256, 512, 1024] {
        let red = create_band(size, 0.3);
        let nir = create_band(size, 0.2);
        let swir = create_band(size, 0.05);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| rdri.evaluate(black_box(&[&red, &nir, &swir])).unwrap())
        });
    }
    group.finish();
}

fn bench_mosaic(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite/mosaic");
    for size in [256, 512] {
        let scenes: Vec<Scene> = (0..3)
            .map(|i| {
                let mask = (0..size * size).map(|p| u8::from((p + i) % 3 != 0)).collect();
                Scene::builder(format!("s{}", i), Utc.with_ymd_and_hms(2022, 10, 3, 10 + i as u32, 0, 0).unwrap())
                    .band(bands::GREEN, create_band(size, 0.2))
                    .band(bands::NIR, create_band(size, 0.05))
                    .mask(Raster::from_vec(mask, size, size).unwrap())
                    .build()
                    .unwrap()
            })
            .collect();
        let refs: Vec<&Scene> = scenes.iter().collect();
        let date = scenes[0].date();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| mosaic(date, black_box(&refs)).unwrap())
        });
    }
    group.finish();
}

fn bench_zonal_mean(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics/zonal_mean");
    for size in [256, 512] {
        let grid = create_band(size, 0.1);
        let extent = size as f64 * 10.0;
        let roi = RegionOfInterest::from_coords(
            &[[0.0, 0.0], [extent, 0.0], [extent * 0.5, extent]],
            &[],
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| zonal_mean(black_box(&grid), &roi, 10.0).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_normalized_difference,
    bench_formula,
    bench_mosaic,
    bench_zonal_mean
);
criterion_main!(benches);
