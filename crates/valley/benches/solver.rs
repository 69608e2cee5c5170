//! Benchmarks for the Manning solver and the full per-segment pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::{coord, LineString};
use hgvc_core::{GeoTransform, Raster};
use hgvc_valley::prelude::*;

/// U-shaped valley draining south along the middle column
fn create_inputs(size: usize) -> RunInputs {
    let transform = GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0);
    let mid = (size / 2) as f64;
    let mut dem = Raster::new(size, size);
    dem.set_transform(transform);
    for row in 0..size {
        for col in 0..size {
            let d = (col as f64 - mid).abs();
            let across = if d <= 4.0 { 0.2 * d } else { 0.8 + 6.0 * (d - 4.0) };
            let along = 0.1 * (size - 1 - row) as f64;
            dem.set(row, col, 1000.0 + along + across).unwrap();
        }
    }
    let mut drainage_area = Raster::filled(size, size, 50.0);
    drainage_area.set_transform(transform);
    let mut discharge = Raster::filled(size, size, 30.0);
    discharge.set_transform(transform);
    let mut blocks = Raster::filled(size, size, 1i32);
    blocks.set_transform(transform);
    RunInputs {
        dem,
        drainage_area,
        discharge,
        blocks,
    }
}

fn record(size: usize) -> SegmentRecord {
    let x = (size / 2) as f64 * 10.0 + 5.0;
    let top = size as f64 * 10.0 - 5.0;
    SegmentRecord {
        sequence: 0,
        id: 1,
        length: Some(top - 5.0),
        slope_class: 2,
        course: LineString::new(vec![coord! { x: x, y: top }, coord! { x: x, y: 5.0 }]),
    }
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("manning_solver");

    for size in [64, 128, 256].iter() {
        let ctx = RunContext::new(RunConfig::default(), create_inputs(*size)).unwrap();
        let terrain = ctx.terrain(&record(*size)).unwrap();
        let solver = ManningSolver::new(ctx.config.solver_params());

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| solver.solve(black_box(&terrain), &terrain.hydraulics()).unwrap())
        });
    }

    group.finish();
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_segment");
    group.sample_size(20);

    for size in [64, 128].iter() {
        let ctx = RunContext::new(RunConfig::default(), create_inputs(*size)).unwrap();
        let rec = record(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| process_segment(black_box(&ctx), &rec).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_solver, bench_segment);
criterion_main!(benches);
