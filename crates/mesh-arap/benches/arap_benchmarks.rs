//! Benchmarks for mesh-arap operations.
//!
//! Run with: cargo bench -p mesh-arap
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-arap -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-arap -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mesh_arap::covariance::{accumulate_covariance, edge_displacements};
use mesh_arap::{ArapParams, Edge, arap_evaluate, arap_gradient, solve_rotations};
use nalgebra::{Point3, Rotation3, Vector3};

// =============================================================================
// Test Graph Generation
// =============================================================================

/// A triangulated `n x n` grid in the z = 0 plane.
fn create_grid(n: u32) -> (Vec<Point3<f64>>, Vec<Edge>) {
    let mut verts = Vec::with_capacity((n * n) as usize);
    for y in 0..n {
        for x in 0..n {
            verts.push(Point3::new(x as f64, y as f64, 0.0));
        }
    }

    let idx = |x: u32, y: u32| y * n + x;
    let mut edges = Vec::new();
    for y in 0..n {
        for x in 0..n {
            if x + 1 < n {
                edges.push([idx(x, y), idx(x + 1, y)]);
            }
            if y + 1 < n {
                edges.push([idx(x, y), idx(x, y + 1)]);
            }
            if x + 1 < n && y + 1 < n {
                edges.push([idx(x, y), idx(x + 1, y + 1)]);
            }
        }
    }

    (verts, edges)
}

/// Bend the grid around the y axis so every vertex rotation differs.
fn bend(verts: &[Point3<f64>], span: f64) -> Vec<Point3<f64>> {
    verts
        .iter()
        .map(|p| {
            let angle = p.x / span;
            Rotation3::from_axis_angle(&Vector3::y_axis(), angle) * p
                + Vector3::new(0.0, 0.0, 0.1 * p.y.sin())
        })
        .collect()
}

fn test_cases() -> Vec<(&'static str, Vec<Point3<f64>>, Vec<Point3<f64>>, Vec<Edge>)> {
    [("grid_16", 16), ("grid_64", 64), ("grid_128", 128)]
        .into_iter()
        .map(|(name, n)| {
            let (reference, edges) = create_grid(n);
            let query = bend(&reference, n as f64);
            (name, reference, query, edges)
        })
        .collect()
}

// =============================================================================
// Energy Benchmarks
// =============================================================================

fn bench_energy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Energy");

    for (name, reference, query, edges) in &test_cases() {
        group.throughput(Throughput::Elements(edges.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("arap_energy", name),
            &(reference, query, edges),
            |b, (reference, query, edges)| {
                let params = ArapParams::default();
                b.iter(|| {
                    arap_evaluate(
                        black_box(query),
                        black_box(reference),
                        black_box(edges),
                        &params,
                    )
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// Rotation Solve Benchmarks
// =============================================================================

fn bench_rotations(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rotations");

    for (name, reference, query, edges) in &test_cases() {
        let displacements = edge_displacements(query, reference, edges).expect("valid grid");
        let accumulators =
            accumulate_covariance(&displacements, edges, reference.len()).expect("valid grid");

        group.throughput(Throughput::Elements(accumulators.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("sequential", name),
            &accumulators,
            |b, accumulators| {
                let params = ArapParams::default().sequential();
                b.iter(|| solve_rotations(black_box(accumulators), &params))
            },
        );

        group.bench_with_input(
            BenchmarkId::new("parallel", name),
            &accumulators,
            |b, accumulators| {
                let params = ArapParams::default().with_parallel_threshold(0);
                b.iter(|| solve_rotations(black_box(accumulators), &params))
            },
        );
    }

    group.finish();
}

// =============================================================================
// Gradient Benchmarks
// =============================================================================

fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gradient");
    group.sample_size(20);

    for (name, reference, query, edges) in &test_cases() {
        group.throughput(Throughput::Elements(edges.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("arap_gradient", name),
            &(reference, query, edges),
            |b, (reference, query, edges)| {
                let params = ArapParams::default();
                b.iter(|| {
                    arap_gradient(
                        black_box(query),
                        black_box(reference),
                        black_box(edges),
                        &params,
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_energy, bench_rotations, bench_gradient);
criterion_main!(benches);
