//! The surface between two centerline vertices.
//!
//! The two cutting patches bound a box along the centerline. The surface is kept where
//! it lies in front of the first patch, behind the second, and within the patch
//! half-diagonal of the centerline between them. Faces crossing either plane are
//! clipped, and the open ends are closed with the resolved cross-sections.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::info;

use crate::error::{CenterlineError, CenterlineResult};
use crate::frame::CuttingPlane;
use crate::intersect::PlaneIntersector;
use crate::metrics::SectionEngine;
use crate::resolve::CrossSection;
use crate::types::Mesh;

/// A piece of the surface with its two end caps.
#[derive(Debug, Clone)]
pub struct Segment {
    /// First centerline vertex (the lower index).
    pub start: usize,
    /// Last centerline vertex.
    pub end: usize,
    /// Clipped surface, without caps.
    pub surface: Mesh,
    pub start_cap: CrossSection,
    pub end_cap: CrossSection,
}

impl Segment {
    /// Surface and caps as one mesh.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = self.surface.clone();
        mesh.append(&self.start_cap.geometry);
        mesh.append(&self.end_cap.geometry);
        mesh
    }

    /// Area of the clipped surface, caps excluded.
    pub fn lateral_area(&self) -> f64 {
        self.surface.surface_area()
    }
}

/// Keep the part of `mesh` where `distance >= 0`, clipping faces that cross zero.
///
/// Points created on a crossing edge are shared by both faces of that edge.
pub fn clip_half_space<F>(mesh: &Mesh, distance: F) -> Mesh
where
    F: Fn(&Point3<f64>) -> f64,
{
    let dist: Vec<f64> = mesh.vertices.iter().map(|v| distance(&v.position)).collect();
    let mut out = Mesh::with_capacity(mesh.vertex_count(), mesh.face_count());
    let mut kept: HashMap<u32, u32> = HashMap::new();
    let mut crossings: HashMap<(u32, u32), u32> = HashMap::new();

    for face in &mesh.faces {
        let k = face.len();
        let mut clipped = Vec::with_capacity(k + 2);
        for i in 0..k {
            let a = face[i];
            let b = face[(i + 1) % k];
            let (da, db) = (dist[a as usize], dist[b as usize]);
            if da >= 0.0 {
                let id = *kept
                    .entry(a)
                    .or_insert_with(|| out.push_vertex(mesh.position(a)));
                clipped.push(id);
            }
            if (da >= 0.0) != (db >= 0.0) {
                let key = if a < b { (a, b) } else { (b, a) };
                let id = *crossings.entry(key).or_insert_with(|| {
                    let (lo, hi) = key;
                    let (d_lo, d_hi) = (dist[lo as usize], dist[hi as usize]);
                    let t = d_lo / (d_lo - d_hi);
                    let p_lo = mesh.position(lo);
                    out.push_vertex(p_lo + (mesh.position(hi) - p_lo) * t)
                });
                clipped.push(id);
            }
        }
        clipped.dedup();
        if clipped.len() > 1 && clipped.first() == clipped.last() {
            clipped.pop();
        }
        if clipped.len() >= 3 {
            out.faces.push(clipped);
        }
    }
    out
}

/// Distance from `p` to the nearest segment of a polyline.
fn distance_to_polyline(p: &Point3<f64>, polyline: &[Point3<f64>]) -> f64 {
    if polyline.len() == 1 {
        return (p - polyline[0]).norm();
    }
    polyline
        .windows(2)
        .map(|w| {
            let ab = w[1] - w[0];
            let len2 = ab.norm_squared();
            let t = if len2 > 0.0 {
                ((p - w[0]).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            (p - (w[0] + ab * t)).norm()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Clip the surface of `plane_a`'s front side and `plane_b`'s back side, limited to
/// faces whose vertex mean is within `reach` of `polyline`.
pub fn clip_between(
    mesh: &Mesh,
    plane_a: &CuttingPlane,
    plane_b: &CuttingPlane,
    polyline: &[Point3<f64>],
    reach: f64,
) -> Mesh {
    let near: Vec<usize> = (0..mesh.face_count())
        .filter(|&f| distance_to_polyline(&mesh.polygon(f).centroid(), polyline) <= reach)
        .collect();
    let local = mesh.extract_faces(&near);
    let front = clip_half_space(&local, |p| plane_a.signed_distance(p));
    clip_half_space(&front, |p| -plane_b.signed_distance(p))
}

impl<I: PlaneIntersector + Sync> SectionEngine<'_, I> {
    /// Extract the surface between centerline vertices `a` and `b`, capped with
    /// their cross-sections.
    pub fn extract_segment(
        &self,
        points: &[Point3<f64>],
        a: usize,
        b: usize,
    ) -> CenterlineResult<Segment> {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        if start == end {
            return Err(CenterlineError::invalid_config(format!(
                "segment needs two different vertices, got {} twice",
                start
            )));
        }
        if end >= points.len() {
            return Err(CenterlineError::invalid_centerline(format!(
                "vertex {} out of range for {} points",
                end,
                points.len()
            )));
        }

        let plane_a = self.plane_at(points, start)?;
        let plane_b = self.plane_at(points, end)?;
        let start_cap = self.section_at(points, start, &|| false)?;
        let end_cap = self.section_at(points, end, &|| false)?;

        let reach = self.params().search_radius * std::f64::consts::SQRT_2;
        let surface = clip_between(
            self.mesh(),
            &plane_a,
            &plane_b,
            &points[start..=end],
            reach,
        );

        info!(
            mesh = %self.mesh_name(),
            start,
            end,
            faces = surface.face_count(),
            "Extracted segment"
        );
        Ok(Segment {
            start,
            end,
            surface,
            start_cap,
            end_cap,
        })
    }
}
