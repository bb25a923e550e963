//! Benchmarks for centerline operations.
//!
//! Run with: cargo bench -p centerline
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p centerline -- --save-baseline main
//! 2. After changes: cargo bench -p centerline -- --baseline main

use std::f64::consts::TAU;

use centerline::{
    Centerline, Mesh, Report, SectionEngine, SectionParams, project_faces, project_points,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::Point3;

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Closed faceted tube along +Z, radius 0.5, with a slight bulge halfway.
fn create_tube(segments: usize, rings: usize, length: f64) -> Mesh {
    let mut mesh = Mesh::new();
    for r in 0..rings {
        let z = length * r as f64 / (rings - 1) as f64;
        let radius = 0.5 + 0.1 * (z / length * TAU).sin().max(0.0);
        for k in 0..segments {
            let a = k as f64 / segments as f64 * TAU;
            mesh.push_vertex(Point3::new(radius * a.cos(), radius * a.sin(), z));
        }
    }
    let s = segments as u32;
    for r in 0..(rings as u32 - 1) {
        for k in 0..s {
            let k1 = (k + 1) % s;
            mesh.faces
                .push(vec![r * s + k, r * s + k1, (r + 1) * s + k1, (r + 1) * s + k]);
        }
    }
    let bottom = mesh.push_vertex(Point3::new(0.0, 0.0, 0.0));
    let top = mesh.push_vertex(Point3::new(0.0, 0.0, length));
    let last = (rings as u32 - 1) * s;
    for k in 0..s {
        let k1 = (k + 1) % s;
        mesh.faces.push(vec![bottom, k1, k]);
        mesh.faces.push(vec![top, last + k, last + k1]);
    }
    mesh
}

/// Points along the tube axis, away from both caps.
fn create_axis(n: usize, length: f64) -> Vec<Point3<f64>> {
    (0..n)
        .map(|i| Point3::new(0.0, 0.0, 1.5 + (length - 3.0) * (i as f64 + 0.5) / n as f64))
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_sections(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sections");
    group.sample_size(20);

    let test_cases = [
        ("tube_24x81", create_tube(24, 81, 16.0), 50),
        ("tube_48x161", create_tube(48, 161, 16.0), 100),
    ];

    for (name, mesh, n) in &test_cases {
        let points = create_axis(*n, 16.0);
        group.throughput(Throughput::Elements(*n as u64));

        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "sequential" };
            let params = SectionParams::default()
                .with_search_radius(1.2)
                .with_parallel(parallel);
            let engine = match SectionEngine::new(*name, mesh, params) {
                Ok(engine) => engine,
                Err(e) => panic!("engine setup failed: {}", e),
            };
            group.bench_with_input(BenchmarkId::new(label, name), &points, |b, points| {
                b.iter(|| engine.compute_sections(black_box(points)))
            });
        }
    }

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("Projection");

    let mesh = create_tube(48, 161, 16.0);
    let centerline = create_axis(200, 16.0);
    let vesicles: Vec<Point3<f64>> = mesh.vertices.iter().step_by(7).map(|v| v.position).collect();

    group.throughput(Throughput::Elements(vesicles.len() as u64));
    group.bench_function("points", |b| {
        b.iter(|| project_points(black_box(&centerline), black_box(&vesicles)))
    });

    group.throughput(Throughput::Elements(mesh.face_count() as u64));
    group.bench_function("faces", |b| {
        b.iter(|| project_faces(black_box(&centerline), black_box(&mesh)))
    });

    group.finish();
}

fn bench_resample_and_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("Resample");

    for n in [1_000usize, 10_000] {
        let line = Centerline::new(create_axis(n, 16.0));
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("resample_200", n), &line, |b, line| {
            b.iter(|| line.resample(black_box(200)))
        });
    }

    let mut line = Centerline::new(create_axis(2_000, 16.0));
    line.cross_sectional_areas = vec![0.785; 2_000];
    line.max_radii = vec![0.5; 2_000];
    let report = match Report::from_centerline(&line) {
        Ok(report) => report,
        Err(e) => panic!("report failed: {}", e),
    };
    group.bench_function("render_report_2000", |b| b.iter(|| black_box(&report).render()));

    group.finish();
}

criterion_group!(benches, bench_sections, bench_projection, bench_resample_and_report);
criterion_main!(benches);
