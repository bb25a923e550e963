//! Approximate centerline from two surface vertices.
//!
//! The shortest edge path between the vertices runs along the surface from one end
//! of the tube to the other. Cutting the mesh perpendicular to that path at a few
//! sample indices gives cross-sections whose centroids lie near the medial axis;
//! joining them, subdividing and smoothing gives a first centerline that can be
//! refined to the point density used for sections.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::curve::Centerline;
use crate::error::{CenterlineError, CenterlineResult};
use crate::metrics::{SectionEngine, SectionParams};
use crate::tracing_ext::StageTimer;
use crate::types::{Mesh, edge_keys};

/// Parameters for building an approximate centerline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ApproxParams {
    /// Number of cross-sections taken along the surface path.
    pub samples: usize,
    /// Search radius multiplier for the path sections, which start on the surface.
    pub radius_factor: f64,
    /// Point count the refined centerline is grown toward.
    pub target_points: usize,
    /// Fraction each interior point moves toward its neighbours' midpoint per pass.
    pub smoothing: f64,
}

impl Default for ApproxParams {
    fn default() -> Self {
        Self {
            samples: 25,
            radius_factor: 2.0,
            target_points: 200,
            smoothing: 0.5,
        }
    }
}

impl ApproxParams {
    pub fn validate(&self) -> CenterlineResult<()> {
        if self.samples < 2 {
            return Err(CenterlineError::invalid_config(format!(
                "samples must be at least 2, got {}",
                self.samples
            )));
        }
        if !(self.radius_factor > 0.0) {
            return Err(CenterlineError::invalid_config(format!(
                "radius_factor must be positive, got {}",
                self.radius_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(CenterlineError::invalid_config(format!(
                "smoothing must be in [0, 1], got {}",
                self.smoothing
            )));
        }
        Ok(())
    }
}

/// Heap entry for Dijkstra, ordered as a min-heap on cost.
#[derive(Debug, Clone, Copy)]
struct PathNode {
    cost: f64,
    vertex: u32,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

/// Shortest path between two vertices along mesh edges, as vertex indices from
/// `start` to `end`.
pub fn shortest_surface_path(mesh: &Mesh, start: usize, end: usize) -> CenterlineResult<Vec<u32>> {
    let n = mesh.vertex_count();
    for v in [start, end] {
        if v >= n {
            return Err(CenterlineError::invalid_config(format!(
                "vertex {} out of range for a mesh with {} vertices",
                v, n
            )));
        }
    }

    let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
    for face in &mesh.faces {
        for (a, b) in edge_keys(face) {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
    }

    let mut cost = vec![f64::INFINITY; n];
    let mut previous: Vec<Option<u32>> = vec![None; n];
    let mut heap = BinaryHeap::new();
    cost[start] = 0.0;
    heap.push(PathNode {
        cost: 0.0,
        vertex: start as u32,
    });

    while let Some(PathNode { cost: c, vertex }) = heap.pop() {
        if vertex as usize == end {
            break;
        }
        if c > cost[vertex as usize] {
            continue;
        }
        let Some(neighbors) = adjacency.get(&vertex) else {
            continue;
        };
        let p = mesh.position(vertex);
        for &next in neighbors {
            let candidate = c + (mesh.position(next) - p).norm();
            if candidate < cost[next as usize] {
                cost[next as usize] = candidate;
                previous[next as usize] = Some(vertex);
                heap.push(PathNode {
                    cost: candidate,
                    vertex: next,
                });
            }
        }
    }

    if !cost[end].is_finite() {
        return Err(CenterlineError::PathNotFound { start, end });
    }

    let mut path = vec![end as u32];
    let mut current = end;
    while let Some(prev) = previous[current] {
        path.push(prev);
        current = prev as usize;
    }
    path.reverse();
    debug!(vertices = path.len(), length = cost[end], "Surface path");
    Ok(path)
}

/// Indices `2, 2 + d, 2 + 2d, ...` below `n` with `d = floor(n / (samples - 1))`,
/// plus `n - 3`, sorted and deduplicated. Needs `n >= 5`.
pub fn sample_indices(n: usize, samples: usize) -> Vec<usize> {
    if n < 5 {
        return Vec::new();
    }
    let delta = (n / samples.saturating_sub(1).max(1)).max(1);
    let mut indices: Vec<usize> = (2..n).step_by(delta).collect();
    indices.push(n - 3);
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Insert the midpoint of every segment.
pub fn subdivide_polyline(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(nalgebra::center(&points[i - 1], p));
        }
        out.push(*p);
    }
    out
}

/// One Laplacian pass; end points stay fixed.
pub fn smooth_polyline(points: &[Point3<f64>], factor: f64) -> Vec<Point3<f64>> {
    let n = points.len();
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == 0 || i + 1 == n {
                return *p;
            }
            let mid = nalgebra::center(&points[i - 1], &points[i + 1]);
            p + (mid - p) * factor
        })
        .collect()
}

/// Build an approximate centerline through `mesh` between surface vertices `start`
/// and `end`.
///
/// Path sections that fail are skipped with a warning. At least two must succeed.
pub fn approximate_centerline(
    mesh_name: &str,
    mesh: &Mesh,
    start: usize,
    end: usize,
    section_params: &SectionParams,
    params: &ApproxParams,
) -> CenterlineResult<Centerline> {
    params.validate()?;
    let _timer = StageTimer::start("approx_centerline", mesh_name, mesh.face_count(), 0);

    let path_vertices = shortest_surface_path(mesh, start, end)?;
    let path: Vec<Point3<f64>> = path_vertices.iter().map(|&v| mesh.position(v)).collect();
    let indices = sample_indices(path.len(), params.samples);
    if indices.is_empty() {
        return Err(CenterlineError::invalid_centerline(format!(
            "surface path has {} vertices, need at least 5",
            path.len()
        )));
    }

    let wide = section_params
        .clone()
        .with_search_radius(section_params.search_radius * params.radius_factor)
        .with_parallel(false);
    let engine = SectionEngine::new(mesh_name, mesh, wide)?;

    let mut centers = Vec::with_capacity(indices.len());
    for &i in &indices {
        match engine.section_at(&path, i, &|| false) {
            Ok(section) => centers.push(section.centroid),
            Err(e) => warn!(index = i, error = %e, "Skipping path cross-section"),
        }
    }
    if centers.len() < 2 {
        return Err(CenterlineError::invalid_centerline(format!(
            "only {} of {} path cross-sections succeeded",
            centers.len(),
            indices.len()
        )));
    }

    let points = smooth_polyline(&subdivide_polyline(&centers), params.smoothing);
    info!(
        path_vertices = path.len(),
        sections = centers.len(),
        points = points.len(),
        "Built approximate centerline"
    );
    Ok(Centerline::new(points))
}

impl Centerline {
    /// Subdivide and smooth until there are at least `1.1 * target_points / 2`
    /// points. The result has no per-vertex arrays.
    pub fn refine(&self, target_points: usize, smoothing: f64) -> CenterlineResult<Centerline> {
        if self.len() < 2 {
            return Err(CenterlineError::invalid_centerline(format!(
                "cannot refine {} points",
                self.len()
            )));
        }
        let goal = 1.1 * target_points as f64 / 2.0;
        let mut points = self.points.clone();
        while (points.len() as f64) < goal {
            points = smooth_polyline(&subdivide_polyline(&points), smoothing);
        }
        debug!(from = self.len(), to = points.len(), "Refined centerline");
        Ok(Centerline::new(points))
    }
}
