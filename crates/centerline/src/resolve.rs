//! Choosing the cross-section cap among the faces of a plane cut.
//!
//! A cut of a tubular surface holds many small faces (the clipped walls) and a few
//! large ones. Only faces with more than `candidate_vertex_threshold` vertices are
//! candidates for the cap:
//!
//! - one candidate is the cross-section;
//! - none is a topology error;
//! - with several, candidates touching an exact patch corner are dropped, the one
//!   whose centroid is nearest the centerline point becomes the primary cap, and
//!   every other candidate sharing at least `min_shared_edges` edges with it (the
//!   two halves of a section with a hole) is merged in.

use hashbrown::HashSet;
use nalgebra::Point3;
use tracing::{debug, warn};

use crate::error::{CenterlineError, CenterlineResult};
use crate::frame::CuttingPlane;
use crate::intersect::IntersectionOutcome;
use crate::types::{Mesh, edge_keys};

/// Candidate selection thresholds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ResolveParams {
    /// Faces need strictly more vertices than this to be candidates.
    pub candidate_vertex_threshold: usize,
    /// Edges a candidate must share with the primary cap to be merged in.
    pub min_shared_edges: usize,
}

impl Default for ResolveParams {
    fn default() -> Self {
        Self {
            candidate_vertex_threshold: 6,
            min_shared_edges: 2,
        }
    }
}

/// Faces of a cut chosen as the cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct CapSelection {
    /// Face indices into the cut, primary cap first.
    pub faces: Vec<usize>,
    /// Sum of the selected face areas.
    pub area: f64,
    /// Candidates before any filtering.
    pub candidate_count: usize,
}

/// Why no cap could be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionFailure {
    /// No face is large enough.
    NoCandidates,
    /// Every candidate touches a patch corner.
    OnlyPlaneArtifacts { candidates: usize },
}

/// Indices of the faces with more than `threshold` vertices.
pub fn candidate_faces(cut: &Mesh, threshold: usize) -> Vec<usize> {
    (0..cut.faces.len())
        .filter(|&i| cut.faces[i].len() > threshold)
        .collect()
}

/// Pick the cap faces of `cut` for the centerline point `target`.
pub fn select_cap(
    cut: &Mesh,
    plane: &CuttingPlane,
    target: &Point3<f64>,
    params: &ResolveParams,
) -> Result<CapSelection, SelectionFailure> {
    let candidates = candidate_faces(cut, params.candidate_vertex_threshold);
    let candidate_count = candidates.len();

    match candidates.as_slice() {
        [] => return Err(SelectionFailure::NoCandidates),
        [only] => {
            return Ok(CapSelection {
                faces: vec![*only],
                area: cut.polygon(*only).area(),
                candidate_count,
            });
        }
        _ => {}
    }

    // (a) leftovers of the patch boundary
    let remaining: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&f| !cut.faces[f].iter().any(|&v| plane.is_corner(&cut.position(v))))
        .collect();
    if remaining.len() < candidate_count {
        debug!(
            dropped = candidate_count - remaining.len(),
            "Dropped candidates touching the patch corners"
        );
    }
    if remaining.is_empty() {
        return Err(SelectionFailure::OnlyPlaneArtifacts {
            candidates: candidate_count,
        });
    }

    // (b) nearest centroid, first wins on ties
    let mut primary = remaining[0];
    let mut best = (cut.polygon(primary).centroid() - target).norm();
    for &f in &remaining[1..] {
        let d = (cut.polygon(f).centroid() - target).norm();
        if d < best {
            best = d;
            primary = f;
        }
    }

    // (c) caps joined to the primary across a hole
    let primary_edges: HashSet<(u32, u32)> = edge_keys(&cut.faces[primary]).collect();
    let mut faces = vec![primary];
    for &f in &remaining {
        if f == primary {
            continue;
        }
        let shared = edge_keys(&cut.faces[f])
            .filter(|e| primary_edges.contains(e))
            .count();
        if shared >= params.min_shared_edges {
            faces.push(f);
        }
    }

    let area = faces.iter().map(|&f| cut.polygon(f).area()).sum();
    Ok(CapSelection {
        faces,
        area,
        candidate_count,
    })
}

/// The cross-section at one centerline vertex.
#[derive(Debug, Clone)]
pub struct CrossSection {
    /// Centerline vertex index.
    pub index: usize,
    /// The selected cap faces, as an independent mesh.
    pub geometry: Mesh,
    /// Enclosed area.
    pub area: f64,
    /// Mean of the cap vertices.
    pub centroid: Point3<f64>,
    /// Merge tolerance of the accepted cut.
    pub tolerance: f64,
    /// Number of cuts made.
    pub attempts: usize,
    /// Faces that were large enough to be candidates.
    pub candidate_count: usize,
    /// The cut was accepted after the tolerance ladder gave up.
    pub degenerate: bool,
}

impl CrossSection {
    /// Largest distance from the cap's vertex mean to any cap vertex.
    pub fn max_radius(&self) -> f64 {
        self.geometry.max_radius()
    }

    /// True if more than one cap face was merged (a section with a hole).
    pub fn has_hole(&self) -> bool {
        self.geometry.face_count() > 1
    }
}

/// Turn an accepted cut into a [`CrossSection`], or a topology error carrying the
/// mesh name, vertex index and last tolerance.
pub fn resolve_cross_section(
    mesh_name: &str,
    index: usize,
    outcome: IntersectionOutcome,
    plane: &CuttingPlane,
    params: &ResolveParams,
) -> CenterlineResult<CrossSection> {
    let cut = &outcome.geometry;
    let selection = match select_cap(cut, plane, &plane.center, params) {
        Ok(selection) => selection,
        Err(SelectionFailure::NoCandidates) => {
            return Err(CenterlineError::no_cross_section(
                mesh_name,
                index,
                outcome.tolerance,
                cut.face_count(),
                format!(
                    "no face with more than {} vertices",
                    params.candidate_vertex_threshold
                ),
            ));
        }
        Err(SelectionFailure::OnlyPlaneArtifacts { candidates }) => {
            return Err(CenterlineError::no_cross_section(
                mesh_name,
                index,
                outcome.tolerance,
                cut.face_count(),
                format!("all {} candidate faces touch the patch corners", candidates),
            ));
        }
    };

    if selection.candidate_count > 1 {
        warn!(
            index,
            candidates = selection.candidate_count,
            kept = selection.faces.len(),
            "Several cross-section candidates"
        );
    }

    let geometry = cut.extract_faces(&selection.faces);
    let centroid = geometry.vertex_mean().unwrap_or(plane.center);

    Ok(CrossSection {
        index,
        geometry,
        area: selection.area,
        centroid,
        tolerance: outcome.tolerance,
        attempts: outcome.attempts,
        candidate_count: selection.candidate_count,
        degenerate: outcome.degenerate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::estimate_frame;
    use approx::assert_relative_eq;
    use std::f64::consts::{SQRT_2, TAU};

    fn plane(half_width: f64) -> CuttingPlane {
        let points = vec![
            Point3::new(0.0, 0.0, -1.0),
            Point3::origin(),
            Point3::new(0.0, 0.0, 1.0),
        ];
        CuttingPlane::from_frame(&estimate_frame(&points, 1).unwrap(), half_width)
    }

    /// Push a regular n-gon in z = 0 and return its vertex ids.
    fn ngon(mesh: &mut Mesh, n: usize, radius: f64, cx: f64) -> Vec<u32> {
        (0..n)
            .map(|k| {
                let a = k as f64 / n as f64 * TAU;
                mesh.push_vertex(Point3::new(cx + radius * a.cos(), radius * a.sin(), 0.0))
            })
            .collect()
    }

    fn octagon_area(r: f64) -> f64 {
        2.0 * SQRT_2 * r * r
    }

    fn outcome(geometry: Mesh) -> IntersectionOutcome {
        IntersectionOutcome {
            geometry,
            tolerance: 1e-5,
            attempts: 1,
            degenerate: false,
        }
    }

    #[test]
    fn test_single_candidate() {
        let mut cut = Mesh::new();
        let ring = ngon(&mut cut, 8, 1.0, 0.0);
        cut.faces.push(ring);
        let tri = ngon(&mut cut, 3, 0.1, 4.0);
        cut.faces.push(tri);

        let section =
            resolve_cross_section("axon", 3, outcome(cut), &plane(2.0), &ResolveParams::default())
                .unwrap();
        assert_eq!(section.index, 3);
        assert_eq!(section.candidate_count, 1);
        assert_eq!(section.geometry.face_count(), 1);
        assert_relative_eq!(section.area, octagon_area(1.0), epsilon = 1e-12);
        assert_relative_eq!(section.max_radius(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_six_vertices_is_not_a_candidate() {
        let mut cut = Mesh::new();
        let hex = ngon(&mut cut, 6, 1.0, 0.0);
        cut.faces.push(hex);

        let err =
            resolve_cross_section("axon", 7, outcome(cut), &plane(2.0), &ResolveParams::default())
                .unwrap_err();
        match err {
            CenterlineError::NoCrossSection {
                index, tolerance, ..
            } => {
                assert_eq!(index, 7);
                assert_eq!(tolerance, 1e-5);
            }
            other => panic!("Expected NoCrossSection, got {:?}", other),
        }
    }

    #[test]
    fn test_hole_halves_are_merged() {
        let mut cut = Mesh::new();
        let outer = ngon(&mut cut, 8, 2.0, 0.0);
        let inner = ngon(&mut cut, 8, 1.0, 0.0);
        // Upper and lower halves of the annulus, bridged at angles 0 and pi.
        let upper = vec![
            outer[0], outer[1], outer[2], outer[3], outer[4], inner[4], inner[3], inner[2],
            inner[1], inner[0],
        ];
        let lower = vec![
            outer[4], outer[5], outer[6], outer[7], outer[0], inner[0], inner[7], inner[6],
            inner[5], inner[4],
        ];
        cut.faces.push(upper);
        cut.faces.push(lower);

        let selection =
            select_cap(&cut, &plane(3.0), &Point3::origin(), &ResolveParams::default()).unwrap();
        assert_eq!(selection.faces.len(), 2);
        assert_relative_eq!(
            selection.area,
            octagon_area(2.0) - octagon_area(1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_disjoint_candidates_keep_nearest() {
        let mut cut = Mesh::new();
        let near = ngon(&mut cut, 8, 1.0, 5.0);
        let far = ngon(&mut cut, 8, 1.5, 0.0);
        cut.faces.push(far);
        cut.faces.push(near);

        let target = Point3::new(4.8, 0.0, 0.0);
        let selection = select_cap(&cut, &plane(10.0), &target, &ResolveParams::default()).unwrap();
        assert_eq!(selection.faces, vec![1]);
        assert_eq!(selection.candidate_count, 2);
        assert_relative_eq!(selection.area, octagon_area(1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_corner_artifacts_are_dropped() {
        let plane = plane(3.0);
        let mut cut = Mesh::new();

        let cap = ngon(&mut cut, 8, 1.0, 0.5);
        cut.faces.push(cap);

        // Square patch outline with edge midpoints: centroid exactly at the target.
        let c = *plane.corners();
        let mut outline = Vec::new();
        for k in 0..4 {
            let a = c[k];
            let b = c[(k + 1) % 4];
            outline.push(cut.push_vertex(a));
            outline.push(cut.push_vertex(Point3::from((a.coords + b.coords) / 2.0)));
        }
        cut.faces.push(outline);

        let selection = select_cap(&cut, &plane, &plane.center, &ResolveParams::default()).unwrap();
        assert_eq!(selection.faces, vec![0]);
        assert_relative_eq!(selection.area, octagon_area(1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_only_artifacts_is_an_error() {
        let plane = plane(3.0);
        let mut cut = Mesh::new();
        for _ in 0..2 {
            let mut face = Vec::new();
            for &corner in plane.corners() {
                face.push(cut.push_vertex(corner));
                face.push(cut.push_vertex(Point3::from(corner.coords * 0.5)));
            }
            cut.faces.push(face);
        }

        assert_eq!(
            select_cap(&cut, &plane, &plane.center, &ResolveParams::default()),
            Err(SelectionFailure::OnlyPlaneArtifacts { candidates: 2 })
        );
        let err = resolve_cross_section("axon", 0, outcome(cut), &plane, &ResolveParams::default())
            .unwrap_err();
        assert!(err.is_fatal_geometry());
    }

    #[test]
    fn test_candidate_threshold() {
        let mut cut = Mesh::new();
        for n in [3, 6, 7, 12] {
            let face = ngon(&mut cut, n, 1.0, 0.0);
            cut.faces.push(face);
        }
        assert_eq!(candidate_faces(&cut, 6), vec![2, 3]);
        assert_eq!(candidate_faces(&cut, 2), vec![0, 1, 2, 3]);
    }
}
