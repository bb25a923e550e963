//! Plane-mesh intersection with an adaptive merge tolerance.
//!
//! A cut runs in three stages:
//!
//! 1. [`restrict_region`] copies the part of the surface within the search radius of
//!    the centerline vertex (faces with a vertex outside are dropped).
//! 2. A [`PlaneIntersector`] cuts that region with the square [`CuttingPlane`] patch,
//!    merging points closer than the current tolerance.
//! 3. [`intersect_with_retry`] walks the [`ToleranceLadder`] until the cut is usable
//!    or the ladder gives up, in which case the last result is accepted as is.
//!
//! [`SliceIntersector`] is the built-in cutter. Its output mimics a Boolean
//! intersection of a closed surface with a plane: the clipped crossing faces on the
//! back side of the plane (rarely more than 6 vertices) plus one n-gon cap per
//! closed section loop. Loops that leave the patch are closed along the patch
//! boundary through its exact corner positions, and an outer loop with a hole is
//! split into two caps joined by two bridge edges.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point2, Point3};
use tracing::{debug, trace, warn};

use crate::frame::CuttingPlane;
use crate::spatial::SpatialIndex;
use crate::types::Mesh;

/// Anything that can cut a surface region with a plane patch.
///
/// Implementations must not keep state between calls: the retry ladder calls
/// `intersect` repeatedly on the same untouched region.
pub trait PlaneIntersector {
    /// Cut `region` with `plane`, merging points closer than `tolerance`.
    fn intersect(&self, region: &Mesh, plane: &CuttingPlane, tolerance: f64) -> Mesh;
}

/// Schedule of merge tolerances tried after a degenerate cut.
///
/// After a failed attempt at tolerance `t` the next one is:
/// - `reset_to` if `t < reset_below`
/// - `t * step` if `t >= escalate_from`
/// - `t / step` otherwise
///
/// Retrying stops once the next tolerance would exceed `give_up_above` or
/// `max_attempts` cuts have been made.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ToleranceLadder {
    /// Tolerance of the first attempt.
    pub initial: f64,
    /// Factor applied when shrinking or growing.
    pub step: f64,
    /// Below this the ladder jumps back up to `reset_to`.
    pub reset_below: f64,
    /// Where the ladder restarts after bottoming out.
    pub reset_to: f64,
    /// From this tolerance on the ladder grows instead of shrinking.
    pub escalate_from: f64,
    /// The ladder gives up once the next tolerance exceeds this.
    pub give_up_above: f64,
    /// Hard bound on the number of cuts per vertex.
    pub max_attempts: usize,
}

impl Default for ToleranceLadder {
    fn default() -> Self {
        Self {
            initial: 1e-5,
            step: 10.0,
            reset_below: 1e-10,
            reset_to: 1e-4,
            escalate_from: 1e-4,
            give_up_above: 1e-2,
            max_attempts: 32,
        }
    }
}

impl ToleranceLadder {
    /// Tolerance to try after a degenerate cut at `current`.
    pub fn next(&self, current: f64) -> f64 {
        if current < self.reset_below {
            self.reset_to
        } else if current >= self.escalate_from {
            current * self.step
        } else {
            current / self.step
        }
    }

    /// True once `tolerance` is past the give-up bound.
    #[inline]
    pub fn exhausted(&self, tolerance: f64) -> bool {
        tolerance > self.give_up_above
    }

    /// Every tolerance the ladder would try if all cuts were degenerate.
    pub fn schedule(&self) -> Vec<f64> {
        let mut out = vec![self.initial];
        let mut t = self.initial;
        while out.len() < self.max_attempts {
            t = self.next(t);
            if self.exhausted(t) {
                break;
            }
            out.push(t);
        }
        out
    }

    /// Check the ladder terminates and its values make sense.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial > 0.0 && self.reset_to > 0.0) {
            return Err("tolerances must be positive".into());
        }
        if self.step <= 1.0 {
            return Err(format!("step must be greater than 1, got {}", self.step));
        }
        if self.reset_to < self.escalate_from {
            return Err(format!(
                "reset_to ({}) below escalate_from ({}) would cycle forever",
                self.reset_to, self.escalate_from
            ));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }
        Ok(())
    }
}

/// Result of [`intersect_with_retry`].
#[derive(Debug, Clone)]
pub struct IntersectionOutcome {
    /// The accepted cut.
    pub geometry: Mesh,
    /// Tolerance of the accepted cut.
    pub tolerance: f64,
    /// Number of cuts made.
    pub attempts: usize,
    /// True if the ladder gave up and the cut is still degenerate.
    pub degenerate: bool,
}

/// A cut is degenerate if it has no faces or fewer than `min_vertices` vertices.
#[inline]
pub fn is_degenerate(geometry: &Mesh, min_vertices: usize) -> bool {
    geometry.faces.is_empty() || geometry.vertices.len() < min_vertices
}

/// Cut `region` with `plane`, walking the tolerance ladder on degenerate results.
///
/// Returns None if `is_cancelled` reports true between attempts.
pub fn intersect_with_retry<I: PlaneIntersector + ?Sized>(
    intersector: &I,
    region: &Mesh,
    plane: &CuttingPlane,
    ladder: &ToleranceLadder,
    min_vertices: usize,
    is_cancelled: &dyn Fn() -> bool,
) -> Option<IntersectionOutcome> {
    let mut tolerance = ladder.initial;
    let mut geometry = intersector.intersect(region, plane, tolerance);
    let mut attempts = 1;

    while is_degenerate(&geometry, min_vertices) {
        let next = ladder.next(tolerance);
        if ladder.exhausted(next) || attempts >= ladder.max_attempts {
            warn!(
                tolerance,
                attempts,
                faces = geometry.face_count(),
                vertices = geometry.vertex_count(),
                "Tolerance ladder exhausted, accepting degenerate intersection"
            );
            return Some(IntersectionOutcome {
                geometry,
                tolerance,
                attempts,
                degenerate: true,
            });
        }
        if is_cancelled() {
            return None;
        }

        debug!(
            faces = geometry.face_count(),
            vertices = geometry.vertex_count(),
            tolerance = next,
            "Degenerate intersection, retrying"
        );
        tolerance = next;
        geometry = intersector.intersect(region, plane, tolerance);
        attempts += 1;
    }

    Some(IntersectionOutcome {
        geometry,
        tolerance,
        attempts,
        degenerate: false,
    })
}

/// Copy of the mesh around `center`: vertices farther than `radius` are deleted
/// along with every face that uses them.
///
/// Returns the region and the number of vertices found in range.
pub fn restrict_region(
    mesh: &Mesh,
    index: &SpatialIndex,
    center: &Point3<f64>,
    radius: f64,
) -> (Mesh, usize) {
    let hits = index.range_indices(center, radius);
    let mut keep = vec![false; mesh.vertices.len()];
    for &i in &hits {
        if let Some(k) = keep.get_mut(i) {
            *k = true;
        }
    }
    (mesh.retain_vertices(&keep), hits.len())
}

/// Built-in plane cutter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceIntersector;

impl PlaneIntersector for SliceIntersector {
    fn intersect(&self, region: &Mesh, plane: &CuttingPlane, tolerance: f64) -> Mesh {
        slice_region(region, plane, tolerance)
    }
}

// ============================================================================
// Slicing
// ============================================================================

/// Cut a region with a plane patch. See the module docs for the output layout.
pub fn slice_region(region: &Mesh, plane: &CuttingPlane, tolerance: f64) -> Mesh {
    let dist: Vec<f64> = region
        .vertices
        .iter()
        .map(|v| plane.signed_distance(&v.position))
        .collect();
    let side: Vec<i8> = dist
        .iter()
        .map(|&d| {
            if d.abs() <= tolerance {
                0
            } else if d > 0.0 {
                1
            } else {
                -1
            }
        })
        .collect();

    let mut builder = SliceBuilder::new(region, plane, &dist, tolerance);
    let mut segments: Vec<(u32, u32)> = Vec::new();
    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    let mut clipped_faces: Vec<Vec<u32>> = Vec::new();

    for face in &region.faces {
        let on_plane = face.iter().filter(|&&v| side[v as usize] == 0).count();
        if on_plane == face.len() {
            continue;
        }
        let has_below = face.iter().any(|&v| side[v as usize] < 0);
        let has_above = face.iter().any(|&v| side[v as usize] > 0);
        if !(has_below && has_above) && on_plane < 2 {
            continue;
        }

        let crossings = builder.face_crossings(face, &side);
        let mut inside = true;
        for (a, b) in builder.pair_crossings(face, &crossings) {
            match builder.clip_segment(a, b) {
                Some((ca, cb)) => {
                    if (ca, cb) != (a, b) {
                        inside = false;
                    }
                    let (a, b) = (ca, cb);
                    if a != b {
                        let key = if a < b { (a, b) } else { (b, a) };
                        if seen.insert(key) {
                            segments.push((a, b));
                        }
                    }
                }
                None => inside = false,
            }
        }

        if has_below && has_above && inside {
            let below = builder.clip_below(face, &side);
            if below.len() >= 3 {
                clipped_faces.push(below);
            }
        }
    }

    let chains = chain_segments(&segments);
    let mut loops: Vec<Vec<u32>> = Vec::new();
    let mut boundary_faces: Vec<Vec<u32>> = Vec::new();

    for chain in chains {
        if chain.closed {
            if chain.vertices.len() >= 3 {
                loops.push(chain.vertices);
            }
        } else if let Some(face) = builder.close_along_boundary(&chain.vertices) {
            boundary_faces.push(face);
        } else {
            trace!(
                vertices = chain.vertices.len(),
                "Dropping open section chain inside the patch"
            );
        }
    }

    let caps = builder.resolve_holes(loops);

    let mut out = builder.finish();
    out.faces.extend(clipped_faces);
    out.faces.extend(caps);
    out.faces.extend(boundary_faces);

    // Drop points that ended up in no face (discarded chains).
    let all: Vec<usize> = (0..out.faces.len()).collect();
    out.extract_faces(&all)
}

/// Output mesh under construction, with point welding.
struct SliceBuilder<'a> {
    region: &'a Mesh,
    plane: &'a CuttingPlane,
    dist: &'a [f64],
    tolerance: f64,
    cell_size: f64,
    out: Mesh,
    grid: HashMap<(i64, i64, i64), Vec<u32>>,
    edge_points: HashMap<(u32, u32), u32>,
    plane_points: HashMap<u32, u32>,
    below_points: HashMap<u32, u32>,
}

impl<'a> SliceBuilder<'a> {
    fn new(region: &'a Mesh, plane: &'a CuttingPlane, dist: &'a [f64], tolerance: f64) -> Self {
        Self {
            region,
            plane,
            dist,
            tolerance,
            cell_size: (tolerance * 2.0).max(f64::MIN_POSITIVE),
            out: Mesh::new(),
            grid: HashMap::new(),
            edge_points: HashMap::new(),
            plane_points: HashMap::new(),
            below_points: HashMap::new(),
        }
    }

    fn finish(self) -> Mesh {
        self.out
    }

    fn cell(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    /// Index of an existing section point within tolerance of `p`, or a new one.
    fn weld(&mut self, p: Point3<f64>) -> u32 {
        let (cx, cy, cz) = self.cell(&p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(candidates) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &i in candidates {
                            if (self.out.position(i) - p).norm() <= self.tolerance {
                                return i;
                            }
                        }
                    }
                }
            }
        }
        let i = self.out.push_vertex(p);
        self.grid.entry((cx, cy, cz)).or_default().push(i);
        i
    }

    /// Section point on edge (a, b), shared by both faces of the edge.
    fn edge_point(&mut self, a: u32, b: u32) -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&id) = self.edge_points.get(&key) {
            return id;
        }
        let (lo, hi) = key;
        let d_lo = self.dist[lo as usize];
        let d_hi = self.dist[hi as usize];
        let t = d_lo / (d_lo - d_hi);
        let p_lo = self.region.position(lo);
        let p = p_lo + (self.region.position(hi) - p_lo) * t;
        let id = self.weld(p);
        self.edge_points.insert(key, id);
        id
    }

    /// Section point for a region vertex lying on the plane, projected onto it.
    fn plane_point(&mut self, v: u32) -> u32 {
        if let Some(&id) = self.plane_points.get(&v) {
            return id;
        }
        let p = self.region.position(v) - self.plane.normal.into_inner() * self.dist[v as usize];
        let id = self.weld(p);
        self.plane_points.insert(v, id);
        id
    }

    /// Copy of a region vertex behind the plane (never welded).
    fn below_point(&mut self, v: u32) -> u32 {
        if let Some(&id) = self.below_points.get(&v) {
            return id;
        }
        let id = self.out.push_vertex(self.region.position(v));
        self.below_points.insert(v, id);
        id
    }

    /// Section points of one face, in winding order.
    fn face_crossings(&mut self, face: &[u32], side: &[i8]) -> Vec<u32> {
        let k = face.len();
        let mut ids = Vec::with_capacity(4);
        for i in 0..k {
            let a = face[i];
            let b = face[(i + 1) % k];
            let (sa, sb) = (side[a as usize], side[b as usize]);
            if sa == 0 {
                ids.push(self.plane_point(a));
            }
            if sa * sb < 0 {
                ids.push(self.edge_point(a, b));
            }
        }
        ids.dedup();
        if ids.len() > 1 && ids.first() == ids.last() {
            ids.pop();
        }
        ids
    }

    /// Pair the section points of a face into segments.
    ///
    /// Convex faces give exactly two points. Non-convex faces are handled by sorting
    /// the points along the line where the face plane meets the cutting plane.
    fn pair_crossings(&self, face: &[u32], ids: &[u32]) -> Vec<(u32, u32)> {
        match ids.len() {
            0 | 1 => Vec::new(),
            2 => vec![(ids[0], ids[1])],
            _ => {
                let Some(face_normal) = self.region.polygon_of(face).normal() else {
                    return Vec::new();
                };
                let dir = self.plane.normal.cross(&face_normal.into_inner());
                let mut sorted: Vec<(f64, u32)> = ids
                    .iter()
                    .map(|&id| (self.out.position(id).coords.dot(&dir), id))
                    .collect();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
                sorted.chunks_exact(2).map(|c| (c[0].1, c[1].1)).collect()
            }
        }
    }

    /// Clip a segment to the square patch. Returns None if nothing is left.
    fn clip_segment(&mut self, a: u32, b: u32) -> Option<(u32, u32)> {
        let h = self.plane.half_width;
        let qa = self.plane.to_local(&self.out.position(a));
        let qb = self.plane.to_local(&self.out.position(b));
        let inside = |q: &Point2<f64>| q.x.abs() <= h && q.y.abs() <= h;
        if inside(&qa) && inside(&qb) {
            return Some((a, b));
        }

        // Liang-Barsky
        let d = qb - qa;
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        for (p, q) in [
            (-d.x, qa.x + h),
            (d.x, h - qa.x),
            (-d.y, qa.y + h),
            (d.y, h - qa.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    t0 = t0.max(r);
                } else {
                    t1 = t1.min(r);
                }
            }
        }
        if t0 > t1 {
            return None;
        }

        let a = if t0 > 0.0 {
            self.weld(self.plane.to_world(&(qa + d * t0)))
        } else {
            a
        };
        let b = if t1 < 1.0 {
            self.weld(self.plane.to_world(&(qa + d * t1)))
        } else {
            b
        };
        Some((a, b))
    }

    /// The part of a crossing face behind the plane (Sutherland-Hodgman).
    fn clip_below(&mut self, face: &[u32], side: &[i8]) -> Vec<u32> {
        let k = face.len();
        let mut poly = Vec::with_capacity(k + 2);
        for i in 0..k {
            let a = face[i];
            let b = face[(i + 1) % k];
            let (sa, sb) = (side[a as usize], side[b as usize]);
            match sa {
                s if s < 0 => poly.push(self.below_point(a)),
                0 => poly.push(self.plane_point(a)),
                _ => {}
            }
            if sa * sb < 0 {
                poly.push(self.edge_point(a, b));
            }
        }
        poly.dedup();
        if poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        poly
    }

    /// Position of a point along the patch boundary, counter-clockwise from the
    /// first corner, in `[0, 8h)`. None if the point is not on the boundary.
    fn perimeter_param(&self, id: u32) -> Option<f64> {
        let h = self.plane.half_width;
        let q = self.plane.to_local(&self.out.position(id));
        let eps = self.tolerance.max(h * 1e-9);

        // Distance to each side: bottom, right, top, left.
        let gaps = [
            (q.y + h).abs(),
            (q.x - h).abs(),
            (q.y - h).abs(),
            (q.x + h).abs(),
        ];
        let (side, gap) = gaps
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        if gap > eps {
            return None;
        }
        let along = match side {
            0 => q.x + h,
            1 => q.y + h,
            2 => h - q.x,
            _ => h - q.y,
        };
        Some((2.0 * h * side as f64 + along.clamp(0.0, 2.0 * h)) % (8.0 * h))
    }

    /// Close an open chain whose ends lie on the patch boundary by walking the
    /// boundary counter-clockwise from its last point back to its first, through
    /// the exact patch corners.
    fn close_along_boundary(&mut self, chain: &[u32]) -> Option<Vec<u32>> {
        if chain.len() < 2 {
            return None;
        }
        let first = *chain.first()?;
        let last = *chain.last()?;
        let s_start = self.perimeter_param(first)?;
        let s_end = self.perimeter_param(last)?;

        let h = self.plane.half_width;
        let perimeter = 8.0 * h;
        let span = (s_start - s_end).rem_euclid(perimeter);

        let mut passed: Vec<(f64, usize)> = (0..4)
            .map(|k| (k, (2.0 * h * k as f64 - s_end).rem_euclid(perimeter)))
            .filter(|&(_, offset)| offset > 0.0 && offset < span)
            .map(|(k, offset)| (offset, k))
            .collect();
        passed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut face = chain.to_vec();
        for (_, k) in passed {
            // Exact corner positions, never welded.
            let corner = self.plane.corners()[k];
            face.push(self.out.push_vertex(corner));
        }
        Some(face)
    }

    /// Turn closed loops into cap faces. An outer loop directly containing a hole
    /// is split into two faces sharing two bridge edges; further holes in the same
    /// outer loop are dropped.
    fn resolve_holes(&self, loops: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
        if loops.len() < 2 {
            return loops;
        }

        let local: Vec<Vec<Point2<f64>>> = loops
            .iter()
            .map(|l| {
                l.iter()
                    .map(|&id| self.plane.to_local(&self.out.position(id)))
                    .collect()
            })
            .collect();
        let areas: Vec<f64> = local.iter().map(|l| signed_area_2d(l).abs()).collect();

        // Containers of each loop, smallest first.
        let containers: Vec<Vec<usize>> = (0..loops.len())
            .map(|i| {
                let mut c: Vec<usize> = (0..loops.len())
                    .filter(|&j| {
                        j != i && areas[j] > areas[i] && point_in_polygon(&local[i][0], &local[j])
                    })
                    .collect();
                c.sort_by(|&a, &b| areas[a].total_cmp(&areas[b]));
                c
            })
            .collect();

        let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); loops.len()];
        let mut is_hole = vec![false; loops.len()];
        for i in 0..loops.len() {
            if containers[i].len() % 2 == 1 {
                is_hole[i] = true;
                holes_of[containers[i][0]].push(i);
            }
        }

        let mut caps = Vec::with_capacity(loops.len());
        for i in 0..loops.len() {
            if is_hole[i] {
                continue;
            }
            let mut holes = holes_of[i].clone();
            if holes.is_empty() {
                caps.push(loops[i].clone());
                continue;
            }
            holes.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]));
            if holes.len() > 1 {
                debug!(
                    holes = holes.len(),
                    "Section loop has several holes, bridging the largest"
                );
            }
            let hole = holes[0];
            match bridge_hole(&loops[i], &local[i], &loops[hole], &local[hole]) {
                Some((a, b)) => {
                    caps.push(a);
                    caps.push(b);
                }
                None => caps.push(loops[i].clone()),
            }
        }
        caps
    }
}

// ============================================================================
// Loop chaining
// ============================================================================

/// A maximal walk through connected segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub vertices: Vec<u32>,
    pub closed: bool,
}

/// Link undirected segments into chains, in segment order.
pub fn chain_segments(segments: &[(u32, u32)]) -> Vec<Chain> {
    let mut adjacency: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, &(a, b)) in segments.iter().enumerate() {
        adjacency.entry(a).or_default().push(i);
        adjacency.entry(b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();

    let other = |seg: usize, v: u32| -> u32 {
        let (a, b) = segments[seg];
        if a == v { b } else { a }
    };

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = segments[start];
        let mut forward = vec![a, b];
        let mut closed = false;

        // Extend forward from b.
        loop {
            let Some(&tip) = forward.last() else { break };
            let next = adjacency
                .get(&tip)
                .and_then(|segs| segs.iter().copied().find(|&s| !used[s]));
            let Some(seg) = next else { break };
            used[seg] = true;
            let v = other(seg, tip);
            if v == forward[0] {
                closed = true;
                break;
            }
            forward.push(v);
        }

        // Extend backward from a.
        if !closed {
            let mut backward = Vec::new();
            let mut tip = a;
            loop {
                let next = adjacency
                    .get(&tip)
                    .and_then(|segs| segs.iter().copied().find(|&s| !used[s]));
                let Some(seg) = next else { break };
                used[seg] = true;
                tip = other(seg, tip);
                backward.push(tip);
            }
            if !backward.is_empty() {
                backward.reverse();
                backward.extend(forward);
                forward = backward;
            }
        }

        chains.push(Chain {
            vertices: forward,
            closed,
        });
    }

    chains
}

// ============================================================================
// 2D helpers
// ============================================================================

/// Shoelace area, positive for counter-clockwise loops.
pub fn signed_area_2d(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(p: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Split an outer loop with one hole into two simple polygons.
///
/// The outer loop is walked counter-clockwise and the hole clockwise. Bridges run
/// from hole vertex 0 and from the hole vertex half way round to their nearest
/// outer vertices, so the two halves share exactly those two edges.
fn bridge_hole(
    outer: &[u32],
    outer_local: &[Point2<f64>],
    hole: &[u32],
    hole_local: &[Point2<f64>],
) -> Option<(Vec<u32>, Vec<u32>)> {
    if outer.len() < 3 || hole.len() < 3 {
        return None;
    }

    let (outer, outer_local) = oriented(outer, outer_local, true);
    let (hole, hole_local) = oriented(hole, hole_local, false);
    let n = outer.len();
    let m = hole.len();

    let ia = 0;
    let ib = m / 2;
    let nearest = |target: &Point2<f64>, skip: Option<usize>| -> Option<usize> {
        (0..n)
            .filter(|&k| Some(k) != skip)
            .min_by(|&x, &y| {
                (outer_local[x] - target)
                    .norm_squared()
                    .total_cmp(&(outer_local[y] - target).norm_squared())
            })
    };
    let oa = nearest(&hole_local[ia], None)?;
    let ob = nearest(&hole_local[ib], Some(oa))?;

    let walk = |ring: &[u32], from: usize, to: usize| -> Vec<u32> {
        let len = ring.len();
        let steps = (to + len - from) % len;
        (0..=steps).map(|s| ring[(from + s) % len]).collect()
    };

    let mut first = walk(&outer, oa, ob);
    first.extend(walk(&hole, ib, ia));
    let mut second = walk(&outer, ob, oa);
    second.extend(walk(&hole, ia, ib));
    Some((first, second))
}

/// The loop in the requested winding (counter-clockwise if `ccw`).
fn oriented(ids: &[u32], local: &[Point2<f64>], ccw: bool) -> (Vec<u32>, Vec<Point2<f64>>) {
    let is_ccw = signed_area_2d(local) > 0.0;
    if is_ccw == ccw {
        (ids.to_vec(), local.to_vec())
    } else {
        (
            ids.iter().rev().copied().collect(),
            local.iter().rev().copied().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::estimate_frame;
    use crate::types::edge_keys;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::f64::consts::TAU;

    /// Open faceted tube along +Z with quads between rings.
    fn tube(radius: f64, segments: usize, rings: usize, length: f64, offset_x: f64, inward: bool) -> Mesh {
        let mut mesh = Mesh::new();
        for r in 0..rings {
            let z = length * r as f64 / (rings - 1) as f64;
            for k in 0..segments {
                let a = k as f64 / segments as f64 * TAU;
                mesh.push_vertex(Point3::new(offset_x + radius * a.cos(), radius * a.sin(), z));
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

    fn z_plane(z: f64, half_width: f64) -> CuttingPlane {
        let points = vec![
            Point3::new(0.0, 0.0, z - 1.0),
            Point3::new(0.0, 0.0, z),
            Point3::new(0.0, 0.0, z + 1.0),
        ];
        let frame = estimate_frame(&points, 1).unwrap();
        CuttingPlane::from_frame(&frame, half_width)
    }

    fn regular_polygon_area(n: usize, r: f64) -> f64 {
        0.5 * n as f64 * r * r * (TAU / n as f64).sin()
    }

    fn large_faces(mesh: &Mesh) -> Vec<usize> {
        (0..mesh.face_count()).filter(|&i| mesh.faces[i].len() > 6).collect()
    }

    /// Returns degenerate output until a given call number.
    struct ScriptedIntersector {
        good_from_call: usize,
        calls: RefCell<Vec<f64>>,
    }

    impl ScriptedIntersector {
        fn new(good_from_call: usize) -> Self {
            Self {
                good_from_call,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PlaneIntersector for ScriptedIntersector {
        fn intersect(&self, _region: &Mesh, plane: &CuttingPlane, tolerance: f64) -> Mesh {
            let mut calls = self.calls.borrow_mut();
            calls.push(tolerance);
            if calls.len() >= self.good_from_call {
                tube(1.0, 16, 2, 1.0, 0.0, false)
            } else {
                plane.to_mesh()
            }
        }
    }

    #[test]
    fn test_ladder_steps() {
        let ladder = ToleranceLadder::default();
        assert_relative_eq!(ladder.next(1e-5), 1e-6, max_relative = 1e-9);
        assert_relative_eq!(ladder.next(1e-9), 1e-10, max_relative = 1e-9);
        assert_relative_eq!(ladder.next(1e-11), 1e-4);
        assert_relative_eq!(ladder.next(1e-4), 1e-3, max_relative = 1e-9);
        assert!(ladder.exhausted(ladder.next(1e-2)));
    }

    #[test]
    fn test_ladder_schedule() {
        let schedule = ToleranceLadder::default().schedule();
        let expected = [1e-5, 1e-6, 1e-7, 1e-8, 1e-9, 1e-10, 1e-11, 1e-4, 1e-3, 1e-2];
        assert_eq!(schedule.len(), expected.len());
        for (got, want) in schedule.iter().zip(expected) {
            assert_relative_eq!(*got, want, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_ladder_validation() {
        assert!(ToleranceLadder::default().validate().is_ok());
        let cycling = ToleranceLadder {
            reset_to: 1e-6,
            ..Default::default()
        };
        assert!(cycling.validate().is_err());
        let flat = ToleranceLadder {
            step: 1.0,
            ..Default::default()
        };
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_retry_walks_ladder() {
        let intersector = ScriptedIntersector::new(4);
        let region = Mesh::new();
        let plane = z_plane(0.0, 1.0);
        let outcome = intersect_with_retry(
            &intersector,
            &region,
            &plane,
            &ToleranceLadder::default(),
            12,
            &|| false,
        )
        .unwrap();

        assert!(!outcome.degenerate);
        assert_eq!(outcome.attempts, 4);
        assert_relative_eq!(outcome.tolerance, 1e-8, max_relative = 1e-6);

        let calls = intersector.calls.borrow();
        let expected = [1e-5, 1e-6, 1e-7, 1e-8];
        for (got, want) in calls.iter().zip(expected) {
            assert_relative_eq!(*got, want, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_retry_accepts_degenerate_when_exhausted() {
        let intersector = ScriptedIntersector::new(usize::MAX);
        let outcome = intersect_with_retry(
            &intersector,
            &Mesh::new(),
            &z_plane(0.0, 1.0),
            &ToleranceLadder::default(),
            12,
            &|| false,
        )
        .unwrap();
        assert!(outcome.degenerate);
        assert_eq!(outcome.attempts, 10);
        assert_relative_eq!(outcome.tolerance, 1e-2, max_relative = 1e-6);
        assert_eq!(outcome.geometry.vertex_count(), 4);
    }

    #[test]
    fn test_retry_respects_max_attempts() {
        let intersector = ScriptedIntersector::new(usize::MAX);
        let ladder = ToleranceLadder {
            max_attempts: 3,
            ..Default::default()
        };
        let outcome =
            intersect_with_retry(&intersector, &Mesh::new(), &z_plane(0.0, 1.0), &ladder, 12, &|| false)
                .unwrap();
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.degenerate);
    }

    #[test]
    fn test_retry_cancellation() {
        let intersector = ScriptedIntersector::new(usize::MAX);
        let outcome = intersect_with_retry(
            &intersector,
            &Mesh::new(),
            &z_plane(0.0, 1.0),
            &ToleranceLadder::default(),
            12,
            &|| true,
        );
        assert!(outcome.is_none());
        assert_eq!(intersector.calls.borrow().len(), 1);
    }

    #[test]
    fn test_slice_tube() {
        let mesh = tube(0.8, 32, 4, 3.0, 0.0, false);
        let plane = z_plane(1.5, 2.0);
        let cut = SliceIntersector.intersect(&mesh, &plane, 1e-5);

        let caps = large_faces(&cut);
        assert_eq!(caps.len(), 1);
        assert_eq!(cut.faces[caps[0]].len(), 32);
        assert_relative_eq!(
            cut.polygon(caps[0]).area(),
            regular_polygon_area(32, 0.8),
            epsilon = 1e-9
        );
        // One clipped quad per crossing wall face.
        assert_eq!(cut.face_count(), 33);
        assert!(!is_degenerate(&cut, 12));
    }

    #[test]
    fn test_slice_shares_edge_points() {
        let mesh = tube(1.0, 12, 3, 2.0, 0.0, false);
        let plane = z_plane(0.5, 2.0);
        let cut = slice_region(&mesh, &plane, 1e-6);
        // 12 section points shared by caps and clipped faces, plus 12 ring vertices below.
        assert_eq!(cut.vertex_count(), 24);
        for v in &cut.vertices {
            assert!(plane.signed_distance(&v.position) <= 1e-12);
        }
    }

    #[test]
    fn test_slice_misses() {
        let mesh = tube(1.0, 12, 3, 2.0, 0.0, false);
        let cut = slice_region(&mesh, &z_plane(5.0, 2.0), 1e-5);
        assert!(cut.is_empty());
        assert!(is_degenerate(&cut, 12));
    }

    #[test]
    fn test_slice_hollow_tube_bridges_hole() {
        let mut mesh = tube(1.0, 32, 4, 3.0, 0.0, false);
        mesh.append(&tube(0.5, 32, 4, 3.0, 0.0, true));
        let cut = slice_region(&mesh, &z_plane(1.5, 2.0), 1e-5);

        let caps = large_faces(&cut);
        assert_eq!(caps.len(), 2);

        let total: f64 = caps.iter().map(|&i| cut.polygon(i).area()).sum();
        let expected = regular_polygon_area(32, 1.0) - regular_polygon_area(32, 0.5);
        assert_relative_eq!(total, expected, epsilon = 1e-9);

        let a: HashSet<(u32, u32)> = edge_keys(&cut.faces[caps[0]]).collect();
        let shared = edge_keys(&cut.faces[caps[1]]).filter(|e| a.contains(e)).count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_slice_closes_along_patch_boundary() {
        // Circle of radius 1 centred at x = 1 crosses the 1x1 patch top and bottom.
        let mesh = tube(1.0, 64, 3, 2.0, 1.0, false);
        let plane = z_plane(1.0 - 1.0 / 3.0, 0.5);
        let cut = slice_region(&mesh, &plane, 1e-6);

        let with_corner: Vec<usize> = (0..cut.face_count())
            .filter(|&i| cut.faces[i].iter().any(|&v| plane.is_corner(&cut.position(v))))
            .collect();
        assert_eq!(with_corner.len(), 1);
        for v in &cut.vertices {
            let q = plane.to_local(&v.position);
            let in_patch = q.x.abs() <= 0.5 + 1e-9 && q.y.abs() <= 0.5 + 1e-9;
            assert!(in_patch || plane.signed_distance(&v.position) < -1e-9);
        }
    }

    #[test]
    fn test_chain_segments() {
        // A closed square and a separate open path, in scrambled order.
        let segments = [(0, 1), (10, 11), (2, 3), (1, 2), (3, 0), (11, 12)];
        let chains = chain_segments(&segments);
        assert_eq!(chains.len(), 2);

        let square = &chains[0];
        assert!(square.closed);
        assert_eq!(square.vertices.len(), 4);

        let path = &chains[1];
        assert!(!path.closed);
        assert_eq!(path.vertices, vec![10, 11, 12]);
    }

    #[test]
    fn test_chain_extends_backwards() {
        let chains = chain_segments(&[(1, 2), (0, 1)]);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].vertices, vec![0, 1, 2]);
        assert!(!chains[0].closed);
    }

    #[test]
    fn test_point_in_polygon_and_area() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert_relative_eq!(signed_area_2d(&square), 1.0);
        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert_relative_eq!(signed_area_2d(&reversed), -1.0);
        assert!(point_in_polygon(&Point2::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(&Point2::new(1.5, 0.5), &square));
    }

    #[test]
    fn test_restrict_region() {
        let mesh = tube(1.0, 16, 11, 10.0, 0.0, false);
        let index = SpatialIndex::from_mesh(&mesh);
        let (region, found) = restrict_region(&mesh, &index, &Point3::new(0.0, 0.0, 5.0), 1.5);
        // Rings at z = 4, 5, 6 are within 1.5 of the center (distance sqrt(2) at most).
        assert_eq!(found, 48);
        assert_eq!(region.vertex_count(), 48);
        assert_eq!(region.face_count(), 32);
    }
}
