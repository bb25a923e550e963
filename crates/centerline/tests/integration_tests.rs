//! End-to-end runs over synthetic neurite meshes.

use std::f64::consts::TAU;
use std::path::Path;

use approx::assert_relative_eq;
use centerline::io::{load_centerline, load_mesh, save_centerline, save_obj, save_sections};
use centerline::{
    BoutonParams, Centerline, CenterlineError, ErrorCategory, MarkerKind, Mesh, Report,
    ReportColumn, SectionEngine, SectionParams, check_surface, component_centers,
};
use nalgebra::Point3;

/// Closed tube along +Z. `radius_of_ring` gives the radius of each ring.
fn tube_with<F: Fn(usize) -> f64>(radius_of_ring: F, segments: usize, rings: usize, length: f64) -> Mesh {
    let mut mesh = Mesh::new();
    for r in 0..rings {
        let z = length * r as f64 / (rings - 1) as f64;
        let radius = radius_of_ring(r);
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

fn tube(radius: f64) -> Mesh {
    tube_with(|_| radius, 24, 41, 8.0)
}

/// Open tube wall, optionally facing inward.
fn wall(radius: f64, segments: usize, rings: usize, length: f64, inward: bool) -> Mesh {
    let mut mesh = Mesh::new();
    for r in 0..rings {
        let z = length * r as f64 / (rings - 1) as f64;
        for k in 0..segments {
            let a = k as f64 / segments as f64 * TAU;
            mesh.push_vertex(Point3::new(radius * a.cos(), radius * a.sin(), z));
        }
    }
    let s = segments as u32;
    for r in 0..(rings as u32 - 1) {
        for k in 0..s {
            let k1 = (k + 1) % s;
            let mut face = vec![r * s + k, r * s + k1, (r + 1) * s + k1, (r + 1) * s + k];
            if inward {
                face.reverse();
            }
            mesh.faces.push(face);
        }
    }
    mesh
}

fn octahedron(center: Point3<f64>, size: f64) -> Mesh {
    let mut mesh = Mesh::new();
    for d in [
        [size, 0.0, 0.0],
        [-size, 0.0, 0.0],
        [0.0, size, 0.0],
        [0.0, -size, 0.0],
        [0.0, 0.0, size],
        [0.0, 0.0, -size],
    ] {
        mesh.push_vertex(Point3::new(center.x + d[0], center.y + d[1], center.z + d[2]));
    }
    mesh.faces = vec![
        vec![0, 2, 4],
        vec![2, 1, 4],
        vec![1, 3, 4],
        vec![3, 0, 4],
        vec![2, 0, 5],
        vec![1, 2, 5],
        vec![3, 1, 5],
        vec![0, 3, 5],
    ];
    mesh
}

fn polygon_area(n: usize, r: f64) -> f64 {
    0.5 * n as f64 * r * r * (TAU / n as f64).sin()
}

fn write_centerline_text(path: &Path, points: &[Point3<f64>], radius: f64) {
    let text: String = points
        .iter()
        .map(|p| format!("{} {} {} {}\n", p.x, p.y, p.z, radius))
        .collect();
    std::fs::write(path, format!("# x y z r\n{}", text)).unwrap();
}

#[test]
fn test_straight_tube_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("axon.obj");
    let line_path = dir.path().join("axon_centerline.txt");

    let source = tube(0.5);
    assert!(check_surface(&source).is_clean());
    save_obj(&source, &mesh_path).unwrap();

    // Runs slightly past both caps.
    let points: Vec<_> = (0..33)
        .map(|i| Point3::new(0.01, 0.02, -0.4 + 0.275 * i as f64))
        .collect();
    write_centerline_text(&line_path, &points, 0.4);

    let mesh = load_mesh(&mesh_path).unwrap();
    assert_eq!(mesh.face_count(), source.face_count());
    assert_relative_eq!(mesh.surface_area(), source.surface_area(), max_relative = 1e-9);

    let mut line = load_centerline(&line_path).unwrap();
    assert_eq!(line.len(), 33);
    assert_eq!(line.min_radii, vec![0.4; 33]);

    let removed = line.trim_endpoints_outside(&mesh).unwrap();
    assert_eq!(removed, vec![0, 1, 31, 32]);
    assert_eq!(line.len(), 29);

    let mut line = line.resample(15).unwrap();
    assert!((14..=16).contains(&line.len()));
    assert_eq!(line.min_radii.len(), line.len());

    let engine =
        SectionEngine::new("axon", &mesh, SectionParams::default().with_search_radius(1.2)).unwrap();
    let stats = engine.compute(&mut line, None).unwrap();
    assert_eq!(stats.sections, line.len());
    assert_eq!(stats.degenerate, 0);
    assert_eq!(stats.with_holes, 0);
    for (area, radius) in line.cross_sectional_areas.iter().zip(&line.max_radii) {
        assert_relative_eq!(*area, polygon_area(24, 0.5), epsilon = 1e-9);
        assert_relative_eq!(*radius, 0.5, epsilon = 1e-9);
    }

    // A uniform tube wider than the radius threshold only gets large-radius markers.
    let markers = line.detect_boutons(&BoutonParams::default()).unwrap();
    assert_eq!(markers.len(), line.len());
    assert!(markers.iter().all(|m| m.kind == MarkerKind::LargeRadius));

    let mut vesicles = octahedron(line.points[3] + nalgebra::Vector3::new(0.1, 0.0, 0.0), 0.05);
    vesicles.append(&octahedron(line.points[10] + nalgebra::Vector3::new(0.0, 0.1, 0.0), 0.05));
    vesicles.append(&octahedron(line.points[10] + nalgebra::Vector3::new(-0.1, 0.0, 0.0), 0.05));
    let centers = component_centers(&vesicles);
    assert_eq!(centers.len(), 3);
    line.project_vesicles(&centers).unwrap();
    assert_eq!(line.vesicle_counts[3], 1);
    assert_eq!(line.vesicle_counts[10], 2);
    assert_eq!(line.vesicle_counts.iter().sum::<u32>(), 3);

    line.project_surface(&mesh).unwrap();
    let total: f64 = line.area_sums.iter().sum();
    assert_relative_eq!(total, mesh.surface_area(), max_relative = 1e-9);
    assert!(line.validate().is_ok());

    let report = Report::from_centerline(&line).unwrap();
    assert_eq!(report.columns(), ReportColumn::ALL.to_vec());
    let report_path = dir.path().join("axon_report.txt");
    report.save(&report_path).unwrap();
    assert_eq!(Report::load(&report_path).unwrap(), report);

    let vtp_path = dir.path().join("resampled.vtp");
    save_centerline(&line, &vtp_path).unwrap();
    let reloaded = load_centerline(&vtp_path).unwrap();
    assert_eq!(reloaded.len(), line.len());
    for (a, b) in reloaded.points.iter().zip(&line.points) {
        assert!((a - b).norm() < 1e-12);
    }
    assert_eq!(reloaded.min_radii.len(), line.len());

    let sections_path = dir.path().join("sections.obj");
    save_sections(&line, &sections_path).unwrap();
    let sections = load_mesh(&sections_path).unwrap();
    assert!(sections.face_count() >= line.len());
}

#[test]
fn test_hollow_tube_area_excludes_lumen() {
    let mut mesh = wall(1.0, 32, 41, 8.0, false);
    mesh.append(&wall(0.5, 32, 41, 8.0, true));

    let points: Vec<_> = (0..8)
        .map(|i| Point3::new(0.0, 0.0, 2.3 + 0.5 * i as f64))
        .collect();
    let mut line = Centerline::new(points);
    let engine =
        SectionEngine::new("hollow", &mesh, SectionParams::default().with_search_radius(1.5)).unwrap();
    let stats = engine.compute(&mut line, None).unwrap();

    assert_eq!(stats.with_holes, 8);
    let expected = polygon_area(32, 1.0) - polygon_area(32, 0.5);
    for area in &line.cross_sectional_areas {
        assert_relative_eq!(*area, expected, epsilon = 1e-9);
    }
}

/// Quarter torus wall around the Z axis: major radius `major`, minor radius `minor`.
fn bent_tube(major: f64, minor: f64, segments: usize, rings: usize) -> Mesh {
    let mut mesh = Mesh::new();
    let sweep = TAU / 4.0;
    for j in 0..rings {
        let theta = sweep * j as f64 / (rings - 1) as f64;
        for k in 0..segments {
            let a = k as f64 / segments as f64 * TAU;
            let rho = major + minor * a.cos();
            mesh.push_vertex(Point3::new(rho * theta.cos(), rho * theta.sin(), minor * a.sin()));
        }
    }
    let s = segments as u32;
    for j in 0..(rings as u32 - 1) {
        for k in 0..s {
            let k1 = (k + 1) % s;
            mesh.faces
                .push(vec![j * s + k, j * s + k1, (j + 1) * s + k1, (j + 1) * s + k]);
        }
    }
    mesh
}

#[test]
fn test_bent_tube_sections_follow_the_curve() {
    let (major, minor, rings) = (4.0, 0.5, 61);
    let mesh = bent_tube(major, minor, 24, rings);
    let step = (TAU / 4.0) / (rings - 1) as f64;

    // Centerline vertices halfway between rings, away from the open ends.
    let points: Vec<_> = (5..55)
        .map(|j| {
            let theta = (j as f64 + 0.5) * step;
            Point3::new(major * theta.cos(), major * theta.sin(), 0.0)
        })
        .collect();
    let n = points.len();
    let mut line = Centerline::new(points);

    let params = SectionParams::default()
        .with_search_radius(1.2)
        .with_parallel(true);
    let engine = SectionEngine::new("dendrite", &mesh, params).unwrap();
    let stats = engine.compute(&mut line, None).unwrap();
    assert_eq!(stats.sections, n);
    assert_eq!(stats.degenerate, 0);

    // Midpoints of the ring-to-ring edges: the ring polygon squashed radially.
    let expected = polygon_area(24, minor) * (step / 2.0).cos();
    for (i, area) in line.cross_sectional_areas.iter().enumerate() {
        if (2..n - 2).contains(&i) {
            assert_relative_eq!(*area, expected, epsilon = 1e-9);
        } else {
            assert_relative_eq!(*area, expected, max_relative = 0.02);
        }
        assert_eq!(line.sections[i].index, i);
    }
    for radius in &line.max_radii {
        assert_relative_eq!(*radius, minor, max_relative = 0.01);
    }

    let lengths = line.arc_lengths();
    let chord = 2.0 * major * (step / 2.0).sin();
    assert_relative_eq!(lengths[n - 1], chord * (n - 1) as f64, max_relative = 1e-12);
}

#[test]
fn test_swelling_is_marked() {
    // Rings 15..=20 (z in [3, 4]) are swollen.
    let mesh = tube_with(|r| if (15..=20).contains(&r) { 0.9 } else { 0.5 }, 24, 41, 8.0);
    let points: Vec<_> = (0..30)
        .map(|i| Point3::new(0.0, 0.0, 1.1 + 0.2 * i as f64))
        .collect();
    let mut line = Centerline::new(points);
    let engine =
        SectionEngine::new("bouton", &mesh, SectionParams::default().with_search_radius(1.2)).unwrap();
    engine.compute(&mut line, None).unwrap();

    let params = BoutonParams {
        distance_window: 0.5,
        area_change_ratio: 1.3,
        max_radius_threshold: 0.8,
    };
    let markers = line.detect_boutons(&params).unwrap();

    let z_of = |kind: MarkerKind| -> Vec<f64> {
        markers
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| m.position[2])
            .collect()
    };
    let increases = z_of(MarkerKind::Increase);
    let decreases = z_of(MarkerKind::Decrease);
    let large = z_of(MarkerKind::LargeRadius);

    assert!(!increases.is_empty());
    assert!(increases.iter().all(|&z| z > 2.4 && z < 3.0));
    assert!(!decreases.is_empty());
    assert!(decreases.iter().all(|&z| z > 3.6 && z < 4.2));
    assert_eq!(large.len(), 5);
    assert!(large.iter().all(|&z| z > 3.0 && z < 4.0));

    for m in &markers {
        let expected = match m.kind {
            MarkerKind::LargeRadius => params.radius_marker_size(),
            _ => params.change_marker_size(),
        };
        assert_relative_eq!(m.radius, expected);
    }
}

#[test]
fn test_centerline_outside_mesh_fails_at_first_vertex() {
    let mesh = tube(0.5);
    let points: Vec<_> = (0..4)
        .map(|i| Point3::new(20.0, 0.0, 1.0 + i as f64))
        .collect();
    let engine = SectionEngine::new("axon", &mesh, SectionParams::default()).unwrap();

    let mut line = Centerline::new(points);
    let err = engine.compute(&mut line, None).unwrap_err();
    assert!(matches!(err, CenterlineError::SparseRegion { index: 0, found: 0, .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.is_fatal_geometry());
    assert!(line.cross_sectional_areas.is_empty());
}

#[test]
fn test_metrics_need_sections_first() {
    let line = Centerline::new(vec![Point3::origin(), Point3::new(0.0, 0.0, 1.0)]);
    let err = line.detect_boutons(&BoutonParams::default()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Input);
    assert!(save_sections(&line, Path::new("unused.obj")).is_err());
}
