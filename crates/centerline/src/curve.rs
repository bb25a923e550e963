//! The centerline record and the operations that reshape it.

use hashbrown::HashSet;
use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::containment::RayCaster;
use crate::error::{CenterlineError, CenterlineResult};
use crate::metrics::arc_lengths;
use crate::resolve::CrossSection;
use crate::types::Mesh;

/// An ordered polyline through a tubular mesh with its per-vertex arrays.
///
/// Every array is either empty (not computed) or holds exactly one entry per point.
/// [`validate`](Self::validate) checks this; the operations in this crate keep it.
#[derive(Debug, Clone, Default)]
pub struct Centerline {
    pub points: Vec<Point3<f64>>,
    /// Minimum inscribed radius per point, from the centerline source.
    pub min_radii: Vec<f64>,
    pub cross_sectional_areas: Vec<f64>,
    pub max_radii: Vec<f64>,
    /// Vesicle centers nearest to each point.
    pub vesicle_counts: Vec<u32>,
    /// Surface area projected onto each point.
    pub area_sums: Vec<f64>,
    /// Retained cross-section geometry, aligned with `points`.
    pub sections: Vec<CrossSection>,
}

impl Centerline {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    /// Centerline with minimum radii; the radii must align with the points.
    pub fn with_min_radii(points: Vec<Point3<f64>>, min_radii: Vec<f64>) -> CenterlineResult<Self> {
        let centerline = Self {
            points,
            min_radii,
            ..Default::default()
        };
        centerline.validate()?;
        Ok(centerline)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cumulative distance along the polyline, starting at 0.
    pub fn arc_lengths(&self) -> Vec<f64> {
        arc_lengths(&self.points)
    }

    pub fn total_length(&self) -> f64 {
        self.arc_lengths().last().copied().unwrap_or(0.0)
    }

    /// Check that every non-empty per-vertex array has one entry per point.
    pub fn validate(&self) -> CenterlineResult<()> {
        let n = self.points.len();
        let lengths = [
            ("min_radii", self.min_radii.len()),
            ("cross_sectional_areas", self.cross_sectional_areas.len()),
            ("max_radii", self.max_radii.len()),
            ("vesicle_counts", self.vesicle_counts.len()),
            ("area_sums", self.area_sums.len()),
            ("sections", self.sections.len()),
        ];
        for (name, actual) in lengths {
            if actual != 0 && actual != n {
                return Err(CenterlineError::MisalignedArray {
                    name,
                    expected: n,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Drop everything computed from the current point set, keeping the source radii.
    pub fn clear_derived(&mut self) {
        self.cross_sectional_areas.clear();
        self.max_radii.clear();
        self.vesicle_counts.clear();
        self.area_sums.clear();
        self.sections.clear();
    }

    /// Store cross-sections (one per point, in index order) and their areas.
    pub fn set_sections(&mut self, sections: Vec<CrossSection>) -> CenterlineResult<()> {
        if sections.len() != self.points.len() {
            return Err(CenterlineError::MisalignedArray {
                name: "sections",
                expected: self.points.len(),
                actual: sections.len(),
            });
        }
        self.cross_sectional_areas = sections.iter().map(|s| s.area).collect();
        self.sections = sections;
        Ok(())
    }

    /// Fill `max_radii` from the retained cross-sections.
    pub fn compute_max_radii(&mut self) -> CenterlineResult<()> {
        if self.sections.is_empty() {
            return Err(CenterlineError::MissingData {
                what: "cross-sections",
                prerequisite: "centerline sections",
            });
        }
        self.max_radii = self.sections.iter().map(CrossSection::max_radius).collect();
        Ok(())
    }

    /// Subsample to about `npts` points spaced evenly by arc length.
    ///
    /// Walking targets `delta, 2*delta, ...` with `delta = L / (npts - 1)`, each
    /// target keeps the point whose arc length is nearest to it, searching forward
    /// from the last kept point. The first and last points are always kept, and
    /// minimum radii are subsampled alongside. The result carries no derived arrays.
    pub fn resample(&self, npts: usize) -> CenterlineResult<Centerline> {
        if npts < 2 {
            return Err(CenterlineError::invalid_config(format!(
                "resampling needs at least 2 points, got {}",
                npts
            )));
        }
        if self.points.len() < 2 {
            return Err(CenterlineError::invalid_centerline(format!(
                "cannot resample {} points",
                self.points.len()
            )));
        }
        self.validate()?;

        let dists = self.arc_lengths();
        let total = dists[dists.len() - 1];
        if total <= 0.0 {
            return Err(CenterlineError::invalid_centerline("centerline has zero length"));
        }
        let delta = total / (npts - 1) as f64;

        let mut keep: Vec<usize> = vec![0];
        let mut previous = 0;
        let mut target = delta;
        while target < total {
            previous = nearest_arc_index(&dists, previous, target);
            keep.push(previous);
            target += delta;
        }
        keep.push(dists.len() - 1);
        keep.sort_unstable();
        keep.dedup();

        if keep.len() != npts {
            warn!(
                requested = npts,
                created = keep.len(),
                "Resampled centerline has a different number of points"
            );
        }
        info!(from = self.points.len(), to = keep.len(), "Resampled centerline");

        Ok(Centerline {
            points: keep.iter().map(|&i| self.points[i]).collect(),
            min_radii: if self.min_radii.is_empty() {
                Vec::new()
            } else {
                keep.iter().map(|&i| self.min_radii[i]).collect()
            },
            ..Default::default()
        })
    }

    /// Remove end points lying outside the mesh.
    ///
    /// Only the last three and the first three points are tested. Minimum radii stay
    /// aligned; derived arrays are cleared because indices shift. Returns the removed
    /// indices in ascending order.
    pub fn trim_endpoints_outside(&mut self, mesh: &Mesh) -> CenterlineResult<Vec<usize>> {
        let n = self.points.len();
        if n < 3 {
            return Err(CenterlineError::invalid_centerline(format!(
                "need at least 3 points to trim, got {}",
                n
            )));
        }
        if mesh.is_empty() {
            return Err(CenterlineError::EmptyMesh {
                details: "cannot test containment against an empty mesh".into(),
            });
        }
        self.validate()?;

        let caster = RayCaster::new(mesh);
        let mut seen = HashSet::new();
        let mut removed: Vec<usize> = [n - 1, n - 2, n - 3, 0, 1, 2]
            .into_iter()
            .filter(|&i| i < n && seen.insert(i))
            .filter(|&i| !caster.is_inside(&self.points[i]))
            .collect();
        removed.sort_unstable();

        if removed.is_empty() {
            debug!("All centerline end points are inside the mesh");
            return Ok(removed);
        }

        let drop: HashSet<usize> = removed.iter().copied().collect();
        let keep = |v: &Vec<f64>| -> Vec<f64> {
            v.iter()
                .enumerate()
                .filter(|(i, _)| !drop.contains(i))
                .map(|(_, &x)| x)
                .collect()
        };
        if !self.min_radii.is_empty() {
            self.min_radii = keep(&self.min_radii);
        }
        self.points = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, &p)| p)
            .collect();
        self.clear_derived();

        info!(removed = ?removed, remaining = self.points.len(), "Trimmed centerline end points");
        Ok(removed)
    }
}

/// Index at or after `start` whose arc length is nearest `target` (first on ties).
pub fn nearest_arc_index(dists: &[f64], start: usize, target: f64) -> usize {
    let mut best = start;
    let mut best_gap = (dists[start] - target).abs();
    for (i, &d) in dists.iter().enumerate().skip(start + 1) {
        let gap = (d - target).abs();
        if gap < best_gap {
            best_gap = gap;
            best = i;
        } else if d > target {
            break;
        }
    }
    best
}
