//! Bouton (swelling) detection from per-vertex areas and radii.
//!
//! For every vertex `v1`:
//!
//! - a max radius above `max_radius_threshold` gives a large-radius marker;
//! - walking forward while the arc length from `v1` stays below `distance_window`,
//!   the first `v2` with `area[v2] / area[v1]` above `area_change_ratio` marks `v1`
//!   as an increase, below `1 / area_change_ratio` as a decrease. Only the first
//!   qualifying `v2` counts, not the most extreme one.

use nalgebra::Point3;
use tracing::{debug, info};

use crate::curve::Centerline;
use crate::error::{CenterlineError, CenterlineResult};

/// Thresholds for bouton detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct BoutonParams {
    /// Arc length scanned forward from each vertex.
    pub distance_window: f64,
    /// Area ratio that counts as a change (its reciprocal for decreases).
    pub area_change_ratio: f64,
    /// Max radius above which a vertex is marked.
    pub max_radius_threshold: f64,
}

impl Default for BoutonParams {
    fn default() -> Self {
        Self {
            distance_window: 0.2,
            area_change_ratio: 1.3,
            max_radius_threshold: 0.2,
        }
    }
}

impl BoutonParams {
    pub fn validate(&self) -> CenterlineResult<()> {
        if !(self.distance_window > 0.0) {
            return Err(CenterlineError::invalid_config(format!(
                "distance_window must be positive, got {}",
                self.distance_window
            )));
        }
        if !(self.area_change_ratio > 1.0) {
            return Err(CenterlineError::invalid_config(format!(
                "area_change_ratio must be greater than 1, got {}",
                self.area_change_ratio
            )));
        }
        Ok(())
    }

    /// Render radius of large-radius markers.
    pub fn radius_marker_size(&self) -> f64 {
        self.distance_window / 4.0
    }

    /// Render radius of increase and decrease markers.
    pub fn change_marker_size(&self) -> f64 {
        self.distance_window / 6.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum MarkerKind {
    /// Area grows past the ratio within the window.
    Increase,
    /// Area shrinks past the reciprocal ratio within the window.
    Decrease,
    /// Cross-section wider than the radius threshold.
    LargeRadius,
    /// Minimum inscribed radius from the centerline source.
    MinRadius,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MarkerKind::Increase => "increase",
            MarkerKind::Decrease => "decrease",
            MarkerKind::LargeRadius => "large radius",
            MarkerKind::MinRadius => "min radius",
        };
        f.write_str(name)
    }
}

/// A classified centerline vertex, with the radius of the sphere drawn for it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
pub struct BoutonMarker {
    pub index: usize,
    pub kind: MarkerKind,
    pub position: [f64; 3],
    pub radius: f64,
}

impl BoutonMarker {
    fn new(index: usize, kind: MarkerKind, position: &Point3<f64>, radius: f64) -> Self {
        Self {
            index,
            kind,
            position: [position.x, position.y, position.z],
            radius,
        }
    }
}

/// First-match windowed scan over the per-vertex arrays.
///
/// `max_radii` may be empty, which skips the large-radius check. A vertex with zero
/// area has no defined ratio and is never marked as a change.
pub fn detect_boutons(
    points: &[Point3<f64>],
    lengths: &[f64],
    areas: &[f64],
    max_radii: &[f64],
    params: &BoutonParams,
) -> Vec<BoutonMarker> {
    let n = points.len().min(lengths.len()).min(areas.len());
    let ratio = params.area_change_ratio;
    let inverse = 1.0 / ratio;
    let mut markers = Vec::new();

    for v1 in 0..n {
        if max_radii.get(v1).is_some_and(|&r| r > params.max_radius_threshold) {
            markers.push(BoutonMarker::new(
                v1,
                MarkerKind::LargeRadius,
                &points[v1],
                params.radius_marker_size(),
            ));
        }

        if v1 + 1 >= n || areas[v1] <= 0.0 {
            continue;
        }

        let mut v2 = v1 + 1;
        while lengths[v2] - lengths[v1] < params.distance_window {
            let change = areas[v2] / areas[v1];
            if change > ratio || change < inverse {
                let kind = if change > ratio {
                    MarkerKind::Increase
                } else {
                    MarkerKind::Decrease
                };
                debug!(v1, v2, change, %kind, "Area change");
                markers.push(BoutonMarker::new(
                    v1,
                    kind,
                    &points[v1],
                    params.change_marker_size(),
                ));
                break;
            }
            v2 += 1;
            if v2 >= n {
                break;
            }
        }
    }

    markers
}

/// One marker per vertex sized by its minimum inscribed radius.
pub fn min_radius_markers(points: &[Point3<f64>], min_radii: &[f64]) -> Vec<BoutonMarker> {
    points
        .iter()
        .zip(min_radii)
        .enumerate()
        .map(|(i, (p, &r))| BoutonMarker::new(i, MarkerKind::MinRadius, p, r))
        .collect()
}

impl Centerline {
    /// Detect boutons from the stored areas and max radii.
    pub fn detect_boutons(&self, params: &BoutonParams) -> CenterlineResult<Vec<BoutonMarker>> {
        params.validate()?;
        self.validate()?;
        if self.cross_sectional_areas.is_empty() {
            return Err(CenterlineError::MissingData {
                what: "cross-sectional areas",
                prerequisite: "centerline sections",
            });
        }
        if self.max_radii.is_empty() {
            return Err(CenterlineError::MissingData {
                what: "maximum radii",
                prerequisite: "centerline sections",
            });
        }

        let markers = detect_boutons(
            &self.points,
            &self.arc_lengths(),
            &self.cross_sectional_areas,
            &self.max_radii,
            params,
        );
        info!(
            markers = markers.len(),
            increases = markers.iter().filter(|m| m.kind == MarkerKind::Increase).count(),
            decreases = markers.iter().filter(|m| m.kind == MarkerKind::Decrease).count(),
            "Detected boutons"
        );
        Ok(markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<Point3<f64>> {
        (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect()
    }

    fn lengths(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn params(window: f64) -> BoutonParams {
        BoutonParams {
            distance_window: window,
            area_change_ratio: 1.3,
            max_radius_threshold: 10.0,
        }
    }

    #[test]
    fn test_first_match_marks_earliest_vertex() {
        let areas = [1.0, 1.0, 1.0, 5.0, 5.0];
        let markers = detect_boutons(&points(5), &lengths(5), &areas, &[], &params(3.5));

        let first = &markers[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.kind, MarkerKind::Increase);
        assert!(markers.iter().all(|m| m.kind == MarkerKind::Increase));
        assert_eq!(
            markers.iter().map(|m| m.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_window_limits_scan() {
        let areas = [1.0, 1.0, 1.0, 5.0, 5.0];
        // Only the next vertex is within reach.
        let markers = detect_boutons(&points(5), &lengths(5), &areas, &[], &params(1.5));
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].index, 2);
    }

    #[test]
    fn test_decrease_and_first_match_wins() {
        // From vertex 0: 0.7 is a decrease before 2.0 would be an increase.
        let areas = [1.0, 0.7, 2.0];
        let markers = detect_boutons(&points(3), &lengths(3), &areas, &[], &params(10.0));
        assert_eq!(markers[0].index, 0);
        assert_eq!(markers[0].kind, MarkerKind::Decrease);
        assert_eq!(markers[0].radius, 10.0 / 6.0);
        assert_eq!(markers[1].index, 1);
        assert_eq!(markers[1].kind, MarkerKind::Increase);
    }

    #[test]
    fn test_large_radius_markers() {
        let areas = [1.0; 4];
        let max_radii = [0.1, 0.3, 0.2, 0.25];
        let p = BoutonParams {
            distance_window: 1.0,
            area_change_ratio: 1.3,
            max_radius_threshold: 0.2,
        };
        let markers = detect_boutons(&points(4), &lengths(4), &areas, &max_radii, &p);
        let indices: Vec<usize> = markers.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(markers.iter().all(|m| m.kind == MarkerKind::LargeRadius));
        assert_eq!(markers[0].radius, 0.25);
    }

    #[test]
    fn test_zero_area_is_skipped() {
        let areas = [0.0, 1.0];
        assert!(detect_boutons(&points(2), &lengths(2), &areas, &[], &params(5.0)).is_empty());
    }

    #[test]
    fn test_centerline_requires_areas() {
        let c = Centerline::new(points(4));
        match c.detect_boutons(&BoutonParams::default()) {
            Err(CenterlineError::MissingData { what, .. }) => {
                assert_eq!(what, "cross-sectional areas")
            }
            other => panic!("Expected MissingData, got {:?}", other),
        }
    }

    #[test]
    fn test_min_radius_markers() {
        let markers = min_radius_markers(&points(3), &[0.1, 0.2, 0.3]);
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[2].radius, 0.3);
        assert_eq!(markers[2].position, [2.0, 0.0, 0.0]);
        assert!(min_radius_markers(&points(3), &[]).is_empty());
    }

    #[test]
    fn test_params_validation() {
        assert!(BoutonParams::default().validate().is_ok());
        let bad = BoutonParams {
            area_change_ratio: 0.9,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
