//! Benchmarks for transect generation, the extraction run and valley-floor delineation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::LineString;
use openres_algorithms::pipeline::{run_pipeline, PipelineConfig, PipelineInputs};
use openres_algorithms::segments::StreamSegment;
use openres_algorithms::transect::{generate_transect, BoundaryLayer, TransectParams};
use openres_algorithms::valley_floor::{delineate_valley_floor, rasterize_lines, ValleyFloorParams};
use openres_core::{GeoTransform, Raster};
use openres_parallel::CancelToken;

/// A meandering stream along x, cut into `n` segments of 500 units
fn meander(n: usize) -> Vec<StreamSegment> {
    (0..n)
        .map(|i| {
            let x0 = i as f64 * 500.0;
            let pts: Vec<(f64, f64)> = (0..=20)
                .map(|k| {
                    let x = x0 + k as f64 * 25.0;
                    (x, 40.0 * (x / 300.0).sin())
                })
                .collect();
            StreamSegment::new(i as u32 + 1, LineString::from(pts))
        })
        .collect()
}

/// Nested valley lines parallel to the stream, with a wiggle
fn valley_lines(length: f64) -> BoundaryLayer {
    let lines = [150.0, -180.0, 600.0, -650.0]
        .iter()
        .map(|&offset| {
            let pts: Vec<(f64, f64)> = (0..=(length / 50.0) as usize)
                .map(|k| {
                    let x = k as f64 * 50.0;
                    (x, offset + 20.0 * (x / 700.0).cos())
                })
                .collect();
            LineString::from(pts)
        })
        .collect();
    BoundaryLayer::new(lines)
}

/// Trough with a flat floor and steep walls around a channel along the middle row
fn trough_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    let mid = size as f64 / 2.0;
    for row in 0..size {
        for col in 0..size {
            let d = (row as f64 - mid).abs();
            let z = if d < size as f64 / 8.0 { 0.05 * d } else { 5.0 * d };
            dem.set(row, col, 100.0 + z + 0.001 * col as f64).unwrap();
        }
    }
    dem
}

fn bench_transects(c: &mut Criterion) {
    let mut group = c.benchmark_group("transect/generate");
    for n in [10, 100, 400] {
        let segments = meander(n);
        let layer = valley_lines(n as f64 * 500.0);
        let params = TransectParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                for s in &segments {
                    black_box(generate_transect(s, &layer, &params).unwrap());
                }
            })
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/run");
    let mut dem = Raster::filled(200, 2000, 250.0);
    dem.set_transform(GeoTransform::new(0.0, 1000.0, 100.0, -10.0));
    for n in [100, 400] {
        let segments = meander(n);
        let layer = valley_lines(n as f64 * 500.0);
        let inputs = PipelineInputs::new(&segments, &layer, &dem);
        let config = PipelineConfig::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| run_pipeline(black_box(&inputs), &config, &CancelToken::new()).unwrap())
        });
    }
    group.finish();
}

fn bench_valley_floor(c: &mut Criterion) {
    let mut group = c.benchmark_group("valley_floor/delineate");
    group.sample_size(10);
    for size in [128, 256, 512] {
        let dem = trough_dem(size);
        let y = size as f64 * 5.0 - 5.0;
        let channel = rasterize_lines(
            &[LineString::from(vec![(5.0, y), (size as f64 * 10.0 - 5.0, y)])],
            &dem,
        );
        let params = ValleyFloorParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| delineate_valley_floor(black_box(&dem), &channel, &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transects, bench_pipeline, bench_valley_floor);
criterion_main!(benches);
