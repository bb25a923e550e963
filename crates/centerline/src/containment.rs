//! Inside/outside tests by ray casting against a surface mesh.

use nalgebra::{Point3, Vector3};

use crate::types::{Mesh, Triangle};

/// How far the axis rays of [`RayCaster::is_inside`] reach.
pub const MAX_RAY_DISTANCE: f64 = 10_000.0;

const RAY_EPSILON: f64 = 1e-12;

/// The six axis directions probed by [`RayCaster::is_inside`].
pub const AXIS_DIRECTIONS: [Vector3<f64>; 6] = [
    Vector3::new(1.0, 0.0, 0.0),
    Vector3::new(0.0, 1.0, 0.0),
    Vector3::new(0.0, 0.0, 1.0),
    Vector3::new(-1.0, 0.0, 0.0),
    Vector3::new(0.0, -1.0, 0.0),
    Vector3::new(0.0, 0.0, -1.0),
];

/// Fan-triangulated copy of a mesh for repeated ray queries.
#[derive(Debug, Clone)]
pub struct RayCaster {
    triangles: Vec<Triangle>,
}

impl RayCaster {
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            triangles: mesh.triangles().collect(),
        }
    }

    /// Distance to the nearest surface hit along `direction` (unit) within `max_dist`.
    pub fn cast(&self, origin: &Point3<f64>, direction: &Vector3<f64>, max_dist: f64) -> Option<f64> {
        self.triangles
            .iter()
            .filter_map(|tri| ray_triangle_intersect(origin, direction, tri, RAY_EPSILON))
            .filter(|&t| t <= max_dist)
            .min_by(f64::total_cmp)
    }

    /// A point counts as inside when rays along all six axis directions hit the surface.
    pub fn is_inside(&self, p: &Point3<f64>) -> bool {
        AXIS_DIRECTIONS
            .iter()
            .all(|d| self.cast(p, d, MAX_RAY_DISTANCE).is_some())
    }
}

/// One-off version of [`RayCaster::is_inside`], negated.
pub fn point_outside_mesh(p: &Point3<f64>, mesh: &Mesh) -> bool {
    !RayCaster::new(mesh).is_inside(p)
}

/// Möller-Trumbore ray-triangle intersection.
/// Returns the distance t along the ray if intersection occurs.
fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &Triangle,
    epsilon: f64,
) -> Option<f64> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < epsilon {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > epsilon { Some(t) } else { None }
}
