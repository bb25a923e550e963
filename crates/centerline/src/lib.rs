//! Cross-sectional geometry along a centerline through a tubular surface mesh.
//!
//! Given a closed surface (an axon, a dendrite, a vessel) and an ordered polyline
//! running through it, this crate cuts the surface with a plane perpendicular to the
//! polyline at every vertex and measures what it finds.
//!
//! # Features
//!
//! - **Cross-sections**: plane cuts with a tolerance ladder, cap resolution with
//!   hole bridging, areas and maximum radii
//! - **Centerline shaping**: arc-length resampling, end-point trimming, refinement
//! - **Projection**: vesicle counts and surface area sums per centerline vertex
//! - **Boutons**: windowed area-change and large-radius markers
//! - **Approximate centerlines**: built from a shortest surface path when none exists
//! - **Segments**: the capped surface between two centerline vertices
//! - **Reports**: semicolon-delimited per-vertex tables
//! - **File I/O**: OBJ, STL and ASCII VTP meshes; VTP and text centerlines
//!
//! # Units
//!
//! Nothing here assumes a unit. The default search radius of `1.0` suits meshes in
//! microns with neurites a fraction of a micron wide; scale
//! [`SectionParams::search_radius`] with the mesh.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use centerline::{BoutonParams, Report, SectionEngine, SectionParams, io};
//!
//! let mesh = io::load_mesh(Path::new("axon.obj")).unwrap();
//! let mut line = io::load_centerline(Path::new("axon_centerline.vtp")).unwrap();
//! line.trim_endpoints_outside(&mesh).unwrap();
//! let mut line = line.resample(200).unwrap();
//!
//! let engine = SectionEngine::new("axon", &mesh, SectionParams::default()).unwrap();
//! let stats = engine.compute(&mut line, None).unwrap();
//! println!("{} sections, {} with holes", stats.sections, stats.with_holes);
//!
//! let markers = line.detect_boutons(&BoutonParams::default()).unwrap();
//! println!("{} bouton markers", markers.len());
//!
//! Report::from_centerline(&line)
//!     .unwrap()
//!     .save(Path::new("axon_report.txt"))
//!     .unwrap();
//! ```
//!
//! # Without a centerline
//!
//! ```no_run
//! use std::path::Path;
//! use centerline::{ApproxParams, SectionParams, approximate, io};
//!
//! let mesh = io::load_mesh(Path::new("spine.stl")).unwrap();
//! let line = approximate::approximate_centerline(
//!     "spine",
//!     &mesh,
//!     0,
//!     1742,
//!     &SectionParams::default(),
//!     &ApproxParams::default(),
//! )
//! .unwrap();
//! let line = line.refine(200, 0.5).unwrap();
//! ```
//!
//! # Logging
//!
//! Operations emit [`tracing`] events: `info` for finished operations, `debug` for
//! per-vertex detail and `warn` for degenerate cuts, skipped path sections and
//! unclean surfaces. Install any subscriber to see them. Long operations are timed
//! with [`tracing_ext::StageTimer`].

pub mod approximate;
pub mod bouton;
pub mod components;
#[cfg(feature = "config")]
pub mod config;
pub mod containment;
pub mod curve;
pub mod error;
pub mod frame;
pub mod intersect;
pub mod io;
pub mod metrics;
pub mod progress;
pub mod report;
pub mod resolve;
pub mod segment;
pub mod spatial;
pub mod tracing_ext;
pub mod types;
pub mod validate;

pub use approximate::{ApproxParams, approximate_centerline, shortest_surface_path};
pub use bouton::{BoutonMarker, BoutonParams, MarkerKind, detect_boutons, min_radius_markers};
pub use components::{ComponentAnalysis, component_centers, find_connected_components};
#[cfg(feature = "config")]
pub use config::CenterlineConfig;
pub use containment::{RayCaster, point_outside_mesh};
pub use curve::Centerline;
pub use error::{
    CenterlineError, CenterlineResult, ErrorCategory, ErrorCode, ErrorLocation, RecoverySuggestion,
};
pub use frame::{CuttingPlane, LocalFrame, estimate_frame};
pub use intersect::{PlaneIntersector, SliceIntersector, ToleranceLadder};
pub use io::{CenterlineFormat, MeshFormat};
pub use metrics::{
    SectionEngine, SectionParams, SectionStats, arc_lengths, project_faces, project_points,
};
pub use progress::{Progress, ProgressCallback, ProgressTracker};
pub use report::{Report, ReportColumn};
pub use resolve::{CrossSection, ResolveParams};
pub use segment::Segment;
pub use spatial::SpatialIndex;
pub use types::{Mesh, Polygon, Triangle, Vertex};
pub use validate::{MIN_FACES_PER_VERTEX, SurfaceReport, check_surface};
