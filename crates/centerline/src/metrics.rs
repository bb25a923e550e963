//! Per-vertex cross-sections and the reductions built on top of them.
//!
//! [`SectionEngine`] owns the spatial index over one surface mesh and computes the
//! cross-section at every centerline vertex:
//!
//! 1. estimate the local frame and build the square cutting patch,
//! 2. copy the mesh region within the search radius (too few vertices is a
//!    configuration error),
//! 3. cut it, walking the tolerance ladder on degenerate results,
//! 4. resolve the cap faces and their area.
//!
//! Vertices are independent, so with [`SectionParams::parallel`] they are computed on
//! the rayon pool. Each worker copies its own region and results land by index.
//!
//! The projection helpers assign external points or faces to their nearest
//! centerline vertex.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::curve::Centerline;
use crate::error::{CenterlineError, CenterlineResult};
use crate::frame::{CuttingPlane, estimate_frame};
use crate::intersect::{
    PlaneIntersector, SliceIntersector, ToleranceLadder, intersect_with_retry, restrict_region,
};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::resolve::{CrossSection, ResolveParams, resolve_cross_section};
use crate::spatial::SpatialIndex;
use crate::tracing_ext::{StageTimer, log_centerline_stats, log_mesh_stats, log_progress};
use crate::types::Mesh;

/// Parameters of the per-vertex section computation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SectionParams {
    /// Half-width of the cutting patch and radius of the region copied around each
    /// centerline vertex.
    pub search_radius: f64,
    /// A region with fewer mesh vertices than this is a configuration error.
    pub min_region_points: usize,
    /// Cuts with fewer vertices than this are retried.
    pub min_intersection_vertices: usize,
    pub resolve: ResolveParams,
    pub ladder: ToleranceLadder,
    /// Compute vertices on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SectionParams {
    fn default() -> Self {
        Self {
            search_radius: 1.0,
            min_region_points: 100,
            min_intersection_vertices: 12,
            resolve: ResolveParams::default(),
            ladder: ToleranceLadder::default(),
            parallel: false,
        }
    }
}

impl SectionParams {
    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> CenterlineResult<()> {
        if !(self.search_radius.is_finite() && self.search_radius > 0.0) {
            return Err(CenterlineError::invalid_config(format!(
                "search_radius must be positive, got {}",
                self.search_radius
            )));
        }
        self.ladder
            .validate()
            .map_err(|details| CenterlineError::invalid_config(format!("ladder: {}", details)))
    }
}

/// Counts from a full section run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionStats {
    pub sections: usize,
    /// Accepted after the tolerance ladder gave up.
    pub degenerate: usize,
    /// Sections made of more than one cap face.
    pub with_holes: usize,
    /// Sections that needed more than one cut.
    pub retried: usize,
}

impl SectionStats {
    pub fn from_sections(sections: &[CrossSection]) -> Self {
        Self {
            sections: sections.len(),
            degenerate: sections.iter().filter(|s| s.degenerate).count(),
            with_holes: sections.iter().filter(|s| s.has_hole()).count(),
            retried: sections.iter().filter(|s| s.attempts > 1).count(),
        }
    }
}

/// Cross-section computation over one surface mesh.
pub struct SectionEngine<'a, I = SliceIntersector> {
    mesh_name: String,
    mesh: &'a Mesh,
    index: SpatialIndex,
    intersector: I,
    params: SectionParams,
}

impl<'a> SectionEngine<'a, SliceIntersector> {
    /// Engine using the built-in slicer.
    pub fn new(
        mesh_name: impl Into<String>,
        mesh: &'a Mesh,
        params: SectionParams,
    ) -> CenterlineResult<Self> {
        Self::with_intersector(mesh_name, mesh, params, SliceIntersector)
    }
}

impl<'a, I: PlaneIntersector + Sync> SectionEngine<'a, I> {
    /// Engine using a custom intersector.
    pub fn with_intersector(
        mesh_name: impl Into<String>,
        mesh: &'a Mesh,
        params: SectionParams,
        intersector: I,
    ) -> CenterlineResult<Self> {
        params.validate()?;
        if mesh.is_empty() {
            return Err(CenterlineError::EmptyMesh {
                details: "surface mesh has no faces".into(),
            });
        }
        mesh.validate_indices()?;

        let mesh_name = mesh_name.into();
        log_mesh_stats(mesh, &mesh_name);
        let index = SpatialIndex::from_mesh(mesh);

        Ok(Self {
            mesh_name,
            mesh,
            index,
            intersector,
            params,
        })
    }

    pub fn params(&self) -> &SectionParams {
        &self.params
    }

    pub fn mesh_name(&self) -> &str {
        &self.mesh_name
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    /// The cutting patch at centerline vertex `index`.
    pub fn plane_at(&self, points: &[Point3<f64>], index: usize) -> CenterlineResult<CuttingPlane> {
        let frame = estimate_frame(points, index)?;
        Ok(CuttingPlane::from_frame(&frame, self.params.search_radius))
    }

    /// Cross-section at centerline vertex `index`.
    ///
    /// `is_cancelled` is polled between tolerance attempts.
    pub fn section_at(
        &self,
        points: &[Point3<f64>],
        index: usize,
        is_cancelled: &dyn Fn() -> bool,
    ) -> CenterlineResult<CrossSection> {
        let plane = self.plane_at(points, index)?;
        let (region, found) = restrict_region(
            self.mesh,
            &self.index,
            &plane.center,
            self.params.search_radius,
        );
        if found < self.params.min_region_points {
            return Err(CenterlineError::sparse_region(
                self.mesh_name.as_str(),
                index,
                found,
                self.params.min_region_points,
                self.params.search_radius,
                self.params.ladder.initial,
            ));
        }

        let outcome = intersect_with_retry(
            &self.intersector,
            &region,
            &plane,
            &self.params.ladder,
            self.params.min_intersection_vertices,
            is_cancelled,
        )
        .ok_or(CenterlineError::Cancelled { index })?;

        let section = resolve_cross_section(
            &self.mesh_name,
            index,
            outcome,
            &plane,
            &self.params.resolve,
        )?;
        debug!(
            index,
            region_vertices = found,
            area = section.area,
            tolerance = section.tolerance,
            attempts = section.attempts,
            "Cross-section"
        );
        Ok(section)
    }

    /// Cross-sections at every vertex, in index order.
    pub fn compute_sections(&self, points: &[Point3<f64>]) -> CenterlineResult<Vec<CrossSection>> {
        self.compute_sections_with_progress(points, None)
    }

    /// Cross-sections at every vertex, reporting progress. The callback can cancel by
    /// returning false, which fails with [`CenterlineError::Cancelled`].
    pub fn compute_sections_with_progress(
        &self,
        points: &[Point3<f64>],
        callback: Option<&ProgressCallback>,
    ) -> CenterlineResult<Vec<CrossSection>> {
        let n = points.len();
        if n < 2 {
            return Err(CenterlineError::invalid_centerline(format!(
                "need at least 2 points, got {}",
                n
            )));
        }

        let _timer = StageTimer::start("cross_sections", &self.mesh_name, self.mesh.face_count(), n);
        let tracker = ProgressTracker::new(n);
        let is_cancelled = || tracker.is_cancelled();

        let one = |i: usize| -> CenterlineResult<CrossSection> {
            if !tracker.proceed(callback, i) {
                return Err(CenterlineError::Cancelled { index: i });
            }
            let section = self.section_at(points, i, &is_cancelled)?;
            log_progress("cross_sections", tracker.finish_vertex(), n);
            Ok(section)
        };

        let sections: Vec<CrossSection> = if self.params.parallel {
            (0..n).into_par_iter().map(one).collect::<CenterlineResult<_>>()?
        } else {
            (0..n).map(one).collect::<CenterlineResult<_>>()?
        };

        let stats = SectionStats::from_sections(&sections);
        if stats.degenerate > 0 {
            warn!(
                degenerate = stats.degenerate,
                "Some cross-sections were accepted from degenerate cuts"
            );
        }
        info!(
            mesh = %self.mesh_name,
            sections = stats.sections,
            retried = stats.retried,
            with_holes = stats.with_holes,
            "Computed cross-sections"
        );
        Ok(sections)
    }

    /// Compute and store cross-sections, areas and max radii on `centerline`.
    ///
    /// On error the centerline is left untouched.
    pub fn compute(
        &self,
        centerline: &mut Centerline,
        callback: Option<&ProgressCallback>,
    ) -> CenterlineResult<SectionStats> {
        centerline.validate()?;
        let sections = self.compute_sections_with_progress(&centerline.points, callback)?;
        let stats = SectionStats::from_sections(&sections);
        centerline.set_sections(sections)?;
        centerline.compute_max_radii()?;
        log_centerline_stats(centerline, "after cross-sections");
        Ok(stats)
    }
}

impl<I> std::fmt::Debug for SectionEngine<'_, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionEngine")
            .field("mesh_name", &self.mesh_name)
            .field("index", &self.index)
            .field("params", &self.params)
            .finish()
    }
}

/// Cumulative distance along a polyline; the first entry is 0.
pub fn arc_lengths(points: &[Point3<f64>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += (p - points[i - 1]).norm();
        }
        out.push(total);
    }
    out
}

/// Number of external points nearest to each centerline vertex.
pub fn project_points(centerline: &[Point3<f64>], points: &[Point3<f64>]) -> Vec<u32> {
    let mut counts = vec![0u32; centerline.len()];
    let index = SpatialIndex::build(centerline);
    for p in points {
        if let Some(hit) = index.nearest(p) {
            counts[hit.index] += 1;
        }
    }
    counts
}

/// Face areas summed at the centerline vertex nearest each face center.
pub fn project_faces(centerline: &[Point3<f64>], mesh: &Mesh) -> Vec<f64> {
    let mut sums = vec![0.0; centerline.len()];
    let index = SpatialIndex::build(centerline);
    for polygon in mesh.polygons() {
        if let Some(hit) = index.nearest(&polygon.centroid()) {
            sums[hit.index] += polygon.area();
        }
    }
    sums
}

impl Centerline {
    /// Count the vesicle centers nearest to each vertex into `vesicle_counts`.
    pub fn project_vesicles(&mut self, centers: &[Point3<f64>]) -> CenterlineResult<()> {
        self.validate()?;
        if self.is_empty() {
            return Err(CenterlineError::invalid_centerline("no points to project onto"));
        }
        self.vesicle_counts = project_points(&self.points, centers);
        info!(vesicles = centers.len(), vertices = self.len(), "Projected vesicle centers");
        Ok(())
    }

    /// Sum the areas of `surface` faces nearest to each vertex into `area_sums`.
    pub fn project_surface(&mut self, surface: &Mesh) -> CenterlineResult<()> {
        self.validate()?;
        if self.is_empty() {
            return Err(CenterlineError::invalid_centerline("no points to project onto"));
        }
        surface.validate_indices()?;
        self.area_sums = project_faces(&self.points, surface);
        info!(faces = surface.face_count(), vertices = self.len(), "Projected surface areas");
        Ok(())
    }
}
