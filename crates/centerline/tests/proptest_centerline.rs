//! Property-based tests for centerline operations.
//!
//! Run with: cargo test -p centerline -- proptest

use centerline::frame::segment_directions;
use centerline::{
    Centerline, Report, ToleranceLadder, arc_lengths, estimate_frame, project_points,
};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// A polyline whose segments all move forward in +Z, so no segment is degenerate
/// and the curve never doubles back.
fn arb_polyline(min_points: usize, max_points: usize) -> impl Strategy<Value = Vec<Point3<f64>>> {
    let step = (-1.0..1.0f64, -1.0..1.0f64, 0.05..2.0f64);
    (
        prop::array::uniform3(-50.0..50.0f64),
        prop::collection::vec(step, (min_points - 1)..max_points),
    )
        .prop_map(|(start, steps)| {
            let mut p = Point3::new(start[0], start[1], start[2]);
            let mut points = vec![p];
            for (dx, dy, dz) in steps {
                p += Vector3::new(dx, dy, dz);
                points.push(p);
            }
            points
        })
}

fn arb_value() -> impl Strategy<Value = f64> {
    prop_oneof![-1e300..1e300f64, -1e-3..1e-3f64, -1e6..1e6f64, Just(0.0)]
}

fn arb_report() -> impl Strategy<Value = Report> {
    (1usize..20).prop_flat_map(|n| {
        (
            prop::collection::vec(arb_value(), n),
            prop::collection::vec(arb_value(), n),
            prop::collection::vec(arb_value(), n),
            prop::collection::vec(any::<u32>(), n),
            prop::collection::vec(arb_value(), n),
        )
            .prop_map(|(distances, areas, max_radii, vesicle_counts, area_sums)| Report {
                distances,
                min_radii: Vec::new(),
                areas,
                max_radii,
                vesicle_counts,
                area_sums,
            })
    })
}

// =============================================================================
// Property Tests: Arc length and frames
// =============================================================================

proptest! {
    /// Arc lengths start at zero and never decrease.
    #[test]
    fn proptest_arc_lengths_monotone(points in arb_polyline(1, 60)) {
        let lengths = arc_lengths(&points);
        prop_assert_eq!(lengths.len(), points.len());
        prop_assert_eq!(lengths[0], 0.0);
        for w in lengths.windows(2) {
            prop_assert!(w[1] >= w[0]);
        }
    }

    /// The first two vertices reuse the first segment for both backward directions,
    /// the last two reuse the last segment for both forward ones.
    #[test]
    fn proptest_frame_boundary_duplication(points in arb_polyline(3, 40)) {
        let n = points.len();
        for i in [0, 1] {
            let d = segment_directions(&points, i).unwrap();
            prop_assert_eq!(d.back1, d.back2);
        }
        for i in [n - 2, n - 1] {
            let d = segment_directions(&points, i).unwrap();
            prop_assert_eq!(d.fwd1, d.fwd2);
        }
        for i in 0..n {
            let frame = estimate_frame(&points, i).unwrap();
            prop_assert!((frame.tangent.norm() - 1.0).abs() < 1e-12);
            prop_assert!(frame.tangent.z > 0.0);
            let z = frame.orientation * Vector3::z();
            prop_assert!((z - frame.tangent.into_inner()).norm() < 1e-9);
        }
    }
}

// =============================================================================
// Property Tests: Resampling and projection
// =============================================================================

proptest! {
    /// Resampling keeps both ends and the radii stay aligned.
    #[test]
    fn proptest_resample_keeps_ends(points in arb_polyline(2, 80), npts in 2usize..40) {
        let radii: Vec<f64> = (0..points.len()).map(|i| i as f64).collect();
        let line = Centerline::with_min_radii(points.clone(), radii).unwrap();
        let resampled = line.resample(npts).unwrap();

        prop_assert_eq!(resampled.points.first(), points.first());
        prop_assert_eq!(resampled.points.last(), points.last());
        prop_assert_eq!(resampled.min_radii.len(), resampled.len());
        prop_assert!(resampled.len() <= points.len());
        // Kept points stay in their original order.
        for w in resampled.min_radii.windows(2) {
            prop_assert!(w[1] > w[0]);
        }
        prop_assert!(resampled.validate().is_ok());
    }

    /// M external points placed on vertex k all land on k.
    #[test]
    fn proptest_projection_counts(
        points in arb_polyline(2, 50),
        k_seed in any::<prop::sample::Index>(),
        m in 1usize..30,
    ) {
        let k = k_seed.index(points.len());
        let external = vec![points[k]; m];
        let counts = project_points(&points, &external);
        prop_assert_eq!(counts.len(), points.len());
        prop_assert_eq!(counts[k] as usize, m);
        prop_assert_eq!(counts.iter().map(|&c| c as usize).sum::<usize>(), m);
    }
}

// =============================================================================
// Property Tests: Tolerance ladder and report
// =============================================================================

proptest! {
    /// Between the reset and escalation bounds the ladder shrinks by one step.
    #[test]
    fn proptest_ladder_shrinks(exponent in 5i32..=9) {
        let ladder = ToleranceLadder::default();
        let t = 10f64.powi(-exponent);
        let next = ladder.next(t);
        prop_assert!((next / 10f64.powi(-exponent - 1) - 1.0).abs() < 1e-9);
    }

    /// Below the reset bound the ladder jumps to the escalation start and then grows.
    #[test]
    fn proptest_ladder_resets_and_grows(exponent in 11i32..=20) {
        let ladder = ToleranceLadder::default();
        let reset = ladder.next(10f64.powi(-exponent));
        prop_assert_eq!(reset, 1e-4);
        prop_assert!((ladder.next(reset) - 1e-3).abs() < 1e-15);
        prop_assert!(!ladder.exhausted(1e-2));
        prop_assert!(ladder.exhausted(ladder.next(1e-2)));
    }

    /// Rendering then parsing gives back the same report.
    #[test]
    fn proptest_report_round_trip(report in arb_report()) {
        let text = report.render().unwrap();
        let parsed = Report::parse(&text).unwrap();
        prop_assert_eq!(parsed, report);
    }
}
