//! Surface checks run before computing sections.
//!
//! Sections assume a closed, single-component surface where every vertex belongs to
//! at least three faces. Nothing here repairs the mesh; it reports what the section
//! pipeline is likely to trip over.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, warn};

use crate::components::find_connected_components;
use crate::types::{Mesh, edge_keys};

/// Vertices in fewer faces than this are reported as hanging.
pub const MIN_FACES_PER_VERTEX: u32 = 3;

/// Result of [`check_surface`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(serde::Serialize))]
pub struct SurfaceReport {
    pub vertex_count: usize,
    pub face_count: usize,
    /// Vertices used by fewer than [`MIN_FACES_PER_VERTEX`] faces (unused ones included).
    pub hanging_vertices: Vec<u32>,
    /// Edges with a single adjacent face.
    pub boundary_edge_count: usize,
    /// Edges with more than two adjacent faces.
    pub non_manifold_edge_count: usize,
    pub component_count: usize,
    /// Vertices with a NaN or infinite coordinate.
    pub non_finite_vertices: usize,
    /// Largest face arity.
    pub max_face_vertices: usize,
    pub surface_area: f64,
    #[cfg_attr(feature = "config", serde(skip))]
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,
}

impl SurfaceReport {
    /// Closed, manifold, one piece, no hanging vertices.
    pub fn is_clean(&self) -> bool {
        self.face_count > 0
            && self.hanging_vertices.is_empty()
            && self.boundary_edge_count == 0
            && self.non_manifold_edge_count == 0
            && self.component_count == 1
            && self.non_finite_vertices == 0
    }
}

impl std::fmt::Display for SurfaceReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Surface Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {} (largest has {} vertices)", self.face_count, self.max_face_vertices)?;
        writeln!(f, "  Components: {}", self.component_count)?;
        if let Some((min, max)) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
        }
        writeln!(f, "  Surface Area: {:.4}", self.surface_area)?;
        writeln!(f, "  Boundary edges: {}", self.boundary_edge_count)?;
        writeln!(f, "  Non-manifold edges: {}", self.non_manifold_edge_count)?;
        writeln!(
            f,
            "  Hanging vertices (< {} faces): {}",
            MIN_FACES_PER_VERTEX,
            self.hanging_vertices.len()
        )?;
        if self.non_finite_vertices > 0 {
            writeln!(f, "  Non-finite vertices: {}", self.non_finite_vertices)?;
        }
        write!(f, "  Clean: {}", if self.is_clean() { "yes" } else { "NO" })
    }
}

/// Inspect a surface and log warnings for anything the section pipeline relies on.
pub fn check_surface(mesh: &Mesh) -> SurfaceReport {
    let hanging_vertices: Vec<u32> = mesh
        .faces_per_vertex()
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count < MIN_FACES_PER_VERTEX)
        .map(|(i, _)| i as u32)
        .collect();

    let mut edge_faces: HashMap<(u32, u32), u32> = HashMap::new();
    for face in &mesh.faces {
        for key in edge_keys(face) {
            *edge_faces.entry(key).or_default() += 1;
        }
    }
    let boundary_edge_count = edge_faces.values().filter(|&&c| c == 1).count();
    let non_manifold_edge_count = edge_faces.values().filter(|&&c| c > 2).count();

    let report = SurfaceReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        hanging_vertices,
        boundary_edge_count,
        non_manifold_edge_count,
        component_count: find_connected_components(mesh).component_count,
        non_finite_vertices: mesh
            .vertices
            .iter()
            .filter(|v| !v.position.coords.iter().all(|c| c.is_finite()))
            .count(),
        max_face_vertices: mesh.faces.iter().map(Vec::len).max().unwrap_or(0),
        surface_area: mesh.surface_area(),
        bounds: mesh.bounds(),
    };

    if !report.hanging_vertices.is_empty() {
        warn!(
            "{} vertices belong to fewer than {} faces",
            report.hanging_vertices.len(),
            MIN_FACES_PER_VERTEX
        );
    }
    if report.boundary_edge_count > 0 {
        warn!(
            "Surface is not closed: {} boundary edges",
            report.boundary_edge_count
        );
    }
    if report.non_manifold_edge_count > 0 {
        warn!(
            "Surface is not manifold: {} non-manifold edges",
            report.non_manifold_edge_count
        );
    }
    if report.component_count > 1 {
        warn!(
            "Surface has {} separate components",
            report.component_count
        );
    }
    if report.non_finite_vertices > 0 {
        warn!("{} vertices have non-finite coordinates", report.non_finite_vertices);
    }

    debug!("{}", report);
    report
}
