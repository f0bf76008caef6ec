//! Benchmarks for mask composition, buffering and polygonization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use forestmgmt_algorithms::constraint::{compose, ExclusionMasks};
use forestmgmt_algorithms::polygonize::polygonize;
use forestmgmt_algorithms::rasterize::{burn_buffered, RegionGrid};
use forestmgmt_core::{GeoTransform, Mask};
use forestmgmt_parallel::TiledProcessor;
use geo::{Coord, Geometry, LineString, Rect};

/// Patchy mask with a mix of large blocks and isolated cells
fn create_mask(size: usize, seed: usize) -> Mask {
    let transform = GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0);
    Mask::from_fn(size, size, transform, |(row, col)| {
        ((row / 8 + col / 8 + seed) % 3 != 0) && ((row * 7 + col * 13 + seed) % 11 != 0)
    })
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");

    for size in [256, 512, 1024].iter() {
        let candidate = create_mask(*size, 0);
        let masks = ExclusionMasks {
            protected: create_mask(*size, 1).inverted(),
            slope: create_mask(*size, 2),
            administrative: create_mask(*size, 3).inverted(),
            riparian: create_mask(*size, 4).inverted(),
            roads: create_mask(*size, 5),
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| compose(black_box(&candidate), black_box(&masks)).unwrap())
        });
    }

    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygonize");

    for size in [128, 256, 512].iter() {
        let mask = create_mask(*size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| polygonize(black_box(&mask)))
        });
    }

    group.finish();
}

fn bench_road_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("road_buffer");
    let extent = 30_000.0;
    let rect = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: extent, y: extent });
    let grid = RegionGrid::covering(&rect, 30.0, Coord { x: 0.0, y: 0.0 }).unwrap();

    // Zig-zag road network crossing the region
    let roads: Vec<Geometry<f64>> = (0..20)
        .map(|i| {
            let y = i as f64 * extent / 20.0;
            let coords: Vec<(f64, f64)> = (0..=30)
                .map(|k| {
                    let x = k as f64 * extent / 30.0;
                    (x, y + if k % 2 == 0 { 0.0 } else { 400.0 })
                })
                .collect();
            Geometry::LineString(LineString::from(coords))
        })
        .collect();

    for tile_size in [128, 512].iter() {
        let processor = TiledProcessor::new(*tile_size);
        group.bench_with_input(BenchmarkId::from_parameter(tile_size), tile_size, |b, _| {
            b.iter(|| burn_buffered(black_box(&roads), 609.6, &grid, &processor).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose, bench_polygonize, bench_road_buffer);
criterion_main!(benches);
