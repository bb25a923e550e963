//! Local frames along a centerline and the cutting planes built from them.
//!
//! The tangent at vertex `i` blends four neighbouring segment directions,
//!
//! ```text
//! t = (back1 + fwd1 + back2 / 2 + fwd2 / 2) / 3
//! ```
//!
//! where `back1 = p[i] - p[i-1]`, `back2 = p[i-1] - p[i-2]`, `fwd1 = p[i+1] - p[i]`
//! and `fwd2 = p[i+2] - p[i+1]`, each normalized. Near the ends the nearest valid
//! segment is duplicated: indices 0 and 1 use `p[1] - p[0]` for both backward
//! directions, and indices N-2 and N-1 use `p[N-1] - p[N-2]` for both forward ones.

use nalgebra::{Point2, Point3, Unit, UnitQuaternion, Vector3};

use crate::error::{CenterlineError, CenterlineResult};
use crate::types::Mesh;

/// The four normalized segment directions around a centerline vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentDirections {
    pub back1: Unit<Vector3<f64>>,
    pub back2: Unit<Vector3<f64>>,
    pub fwd1: Unit<Vector3<f64>>,
    pub fwd2: Unit<Vector3<f64>>,
}

impl SegmentDirections {
    /// Weighted blend of the four directions (not normalized).
    pub fn blend(&self) -> Vector3<f64> {
        (self.back1.into_inner()
            + self.fwd1.into_inner()
            + self.back2.into_inner() / 2.0
            + self.fwd2.into_inner() / 2.0)
            / 3.0
    }
}

/// Position and orientation of the perpendicular plane at one centerline vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// The centerline vertex.
    pub position: Point3<f64>,
    /// Smoothed unit tangent.
    pub tangent: Unit<Vector3<f64>>,
    /// Rotation taking local +Z to the tangent, with local +Y kept towards world +Y.
    pub orientation: UnitQuaternion<f64>,
}

/// Segment directions around vertex `index`, with boundary duplication.
pub fn segment_directions(
    points: &[Point3<f64>],
    index: usize,
) -> CenterlineResult<SegmentDirections> {
    let n = points.len();
    if n < 2 {
        return Err(CenterlineError::invalid_centerline(format!(
            "need at least 2 points for a tangent, got {}",
            n
        )));
    }
    if index >= n {
        return Err(CenterlineError::invalid_centerline(format!(
            "vertex {} out of range for {} points",
            index, n
        )));
    }

    // Direction of segment a -> a+1.
    let segment = |a: usize| -> CenterlineResult<Unit<Vector3<f64>>> {
        Unit::try_new(points[a + 1] - points[a], 0.0)
            .ok_or(CenterlineError::DegenerateSegment { index: a })
    };

    let (back1, back2) = if index <= 1 {
        let s = segment(0)?;
        (s, s)
    } else {
        (segment(index - 1)?, segment(index - 2)?)
    };

    let (fwd1, fwd2) = if index + 2 >= n {
        let s = segment(n - 2)?;
        (s, s)
    } else {
        (segment(index)?, segment(index + 1)?)
    };

    Ok(SegmentDirections {
        back1,
        back2,
        fwd1,
        fwd2,
    })
}

/// Estimate the local frame at centerline vertex `index`.
pub fn estimate_frame(points: &[Point3<f64>], index: usize) -> CenterlineResult<LocalFrame> {
    let directions = segment_directions(points, index)?;
    let tangent = Unit::try_new(directions.blend(), 1e-12).ok_or_else(|| {
        CenterlineError::invalid_centerline(format!(
            "centerline doubles back on itself at vertex {}",
            index
        ))
    })?;

    Ok(LocalFrame {
        position: points[index],
        tangent,
        orientation: track_rotation(&tangent),
    })
}

/// Rotation mapping local +Z onto `direction`, rolling local +Y towards world +Y
/// (world +Z when the direction is nearly vertical in Y).
pub fn track_rotation(direction: &Unit<Vector3<f64>>) -> UnitQuaternion<f64> {
    let up = if direction.dot(&Vector3::y()).abs() > 1.0 - 1e-9 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    UnitQuaternion::face_towards(&direction.into_inner(), &up)
}

/// A square patch of the plane through a centerline vertex, perpendicular to the
/// local tangent.
///
/// Corner positions are computed once and reused verbatim by the intersector, so
/// the resolver can recognise patch-boundary artifacts by exact coordinate equality.
#[derive(Debug, Clone, PartialEq)]
pub struct CuttingPlane {
    /// Patch center (the centerline vertex).
    pub center: Point3<f64>,
    /// Unit normal (the local tangent).
    pub normal: Unit<Vector3<f64>>,
    /// In-plane unit axes (local X and Y).
    pub u_axis: Unit<Vector3<f64>>,
    pub v_axis: Unit<Vector3<f64>>,
    /// Half of the side length.
    pub half_width: f64,
    corners: [Point3<f64>; 4],
}

impl CuttingPlane {
    /// Build the patch for a frame with the given half-width (the search radius).
    pub fn from_frame(frame: &LocalFrame, half_width: f64) -> Self {
        let u_axis = Unit::new_unchecked(frame.orientation * Vector3::x());
        let v_axis = Unit::new_unchecked(frame.orientation * Vector3::y());
        let normal = Unit::new_unchecked(frame.orientation * Vector3::z());
        let center = frame.position;

        // Counter-clockwise around the normal, starting at (-h, -h).
        let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(su, sv)| {
            center + u_axis.into_inner() * (su * half_width) + v_axis.into_inner() * (sv * half_width)
        });

        Self {
            center,
            normal,
            u_axis,
            v_axis,
            half_width,
            corners,
        }
    }

    /// Corner positions, counter-clockwise around the normal.
    #[inline]
    pub fn corners(&self) -> &[Point3<f64>; 4] {
        &self.corners
    }

    /// True if `p` equals one of the corners exactly.
    pub fn is_corner(&self, p: &Point3<f64>) -> bool {
        self.corners.iter().any(|c| c == p)
    }

    /// Signed distance of `p` from the plane along the normal.
    #[inline]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.center).dot(&self.normal)
    }

    /// In-plane coordinates of `p` (its projection onto the plane).
    #[inline]
    pub fn to_local(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.center;
        Point2::new(d.dot(&self.u_axis), d.dot(&self.v_axis))
    }

    /// World position of in-plane coordinates.
    #[inline]
    pub fn to_world(&self, q: &Point2<f64>) -> Point3<f64> {
        self.center + self.u_axis.into_inner() * q.x + self.v_axis.into_inner() * q.y
    }

    /// The patch as a one-face mesh.
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::with_capacity(4, 1);
        for c in &self.corners {
            mesh.push_vertex(*c);
        }
        mesh.faces.push(vec![0, 1, 2, 3]);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wiggly(n: usize) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.3;
                Point3::new(t.sin(), 0.2 * t.cos(), t)
            })
            .collect()
    }

    #[test]
    fn test_boundary_duplication_start() {
        let points = wiggly(10);
        let d0 = segment_directions(&points, 0).unwrap();
        let d1 = segment_directions(&points, 1).unwrap();
        assert_eq!(d0.back1, d1.back1);
        assert_eq!(d0.back2, d1.back2);
        assert_eq!(d0.back1, d0.back2);
    }

    #[test]
    fn test_boundary_duplication_end() {
        let points = wiggly(10);
        let a = segment_directions(&points, 8).unwrap();
        let b = segment_directions(&points, 9).unwrap();
        assert_eq!(a.fwd1, b.fwd1);
        assert_eq!(a.fwd2, b.fwd2);
        assert_eq!(a.fwd1, a.fwd2);
    }

    #[test]
    fn test_interior_directions() {
        let points = wiggly(10);
        let d = segment_directions(&points, 4).unwrap();
        let expected = Unit::new_normalize(points[4] - points[3]);
        assert_relative_eq!(d.back1.into_inner(), expected.into_inner(), epsilon = 1e-12);
        let expected = Unit::new_normalize(points[6] - points[5]);
        assert_relative_eq!(d.fwd2.into_inner(), expected.into_inner(), epsilon = 1e-12);
    }

    #[test]
    fn test_straight_line_tangent() {
        let points: Vec<_> = (0..6).map(|i| Point3::new(0.0, 0.0, i as f64 * 0.5)).collect();
        for i in 0..points.len() {
            let frame = estimate_frame(&points, i).unwrap();
            assert_relative_eq!(frame.tangent.into_inner(), Vector3::z(), epsilon = 1e-12);
            assert_relative_eq!(
                frame.orientation * Vector3::z(),
                Vector3::z(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_orientation_tracks_tangent() {
        let points = wiggly(12);
        for i in 0..points.len() {
            let frame = estimate_frame(&points, i).unwrap();
            let z = frame.orientation * Vector3::z();
            assert_relative_eq!(z, frame.tangent.into_inner(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_two_point_centerline() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let frame = estimate_frame(&points, 1).unwrap();
        assert_relative_eq!(frame.tangent.into_inner(), Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let points = vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        match estimate_frame(&points, 1) {
            Err(CenterlineError::DegenerateSegment { index }) => assert_eq!(index, 1),
            other => panic!("Expected DegenerateSegment, got {:?}", other),
        }
        assert!(estimate_frame(&points[..1], 0).is_err());
    }

    #[test]
    fn test_cutting_plane_geometry() {
        let points = wiggly(8);
        let frame = estimate_frame(&points, 3).unwrap();
        let plane = CuttingPlane::from_frame(&frame, 0.75);

        for c in plane.corners() {
            assert!(plane.signed_distance(c).abs() < 1e-12);
            let local = plane.to_local(c);
            assert_relative_eq!(local.x.abs(), 0.75, epsilon = 1e-12);
            assert_relative_eq!(local.y.abs(), 0.75, epsilon = 1e-12);
            assert!(plane.is_corner(c));
        }
        assert!(!plane.is_corner(&plane.center));

        let mesh = plane.to_mesh();
        assert_relative_eq!(mesh.surface_area(), 1.5 * 1.5, epsilon = 1e-12);
        let n = mesh.polygon(0).normal().unwrap();
        assert_relative_eq!(n.into_inner(), plane.normal.into_inner(), epsilon = 1e-12);

        let q = Point2::new(0.3, -0.2);
        assert_relative_eq!(plane.to_local(&plane.to_world(&q)), q, epsilon = 1e-12);
    }
}
