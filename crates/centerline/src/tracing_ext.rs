//! Logging helpers shared by the pipeline stages.
//!
//! | target | emitted by |
//! |---|---|
//! | `centerline::timing` | [`StageTimer`] |
//! | `centerline::progress` | [`log_progress`] |
//! | `centerline::state` | [`log_mesh_stats`], [`log_centerline_stats`] |
//! | `centerline::io` | [`log_io`] |
//!
//! `RUST_LOG=centerline::timing=info` prints one line per stage with its wall time.

use std::fmt::Display;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{Centerline, Mesh};

/// Logs the wall time of a pipeline stage on drop, per vertex when the stage walks
/// a centerline.
pub struct StageTimer {
    stage: &'static str,
    points: usize,
    start: Instant,
    _span: tracing::span::EnteredSpan,
}

impl StageTimer {
    pub fn start(stage: &'static str, mesh_name: &str, faces: usize, points: usize) -> Self {
        let span = tracing::info_span!("stage", stage, mesh = mesh_name).entered();
        debug!(target: "centerline::timing", faces, points, "Stage started");
        Self {
            stage,
            points,
            start: Instant::now(),
            _span: span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let ms = self.elapsed_ms();
        if self.points > 0 {
            info!(
                target: "centerline::timing",
                stage = self.stage,
                elapsed_ms = format!("{:.2}", ms),
                per_vertex_ms = format!("{:.3}", ms / self.points as f64),
                "Stage finished"
            );
        } else {
            info!(
                target: "centerline::timing",
                stage = self.stage,
                elapsed_ms = format!("{:.2}", ms),
                "Stage finished"
            );
        }
    }
}

pub fn log_mesh_stats(mesh: &Mesh, name: &str) {
    let (min, max) = mesh.bounds().unwrap_or_default();
    let dims = max - min;
    debug!(
        target: "centerline::state",
        mesh = name,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        extent = format!("{:.3} x {:.3} x {:.3}", dims.x, dims.y, dims.z),
        "Surface loaded"
    );
}

/// Which per-vertex arrays are filled.
pub fn log_centerline_stats(centerline: &Centerline, context: &str) {
    debug!(
        target: "centerline::state",
        context,
        points = centerline.len(),
        length = format!("{:.4}", centerline.total_length()),
        min_radii = !centerline.min_radii.is_empty(),
        areas = !centerline.cross_sectional_areas.is_empty(),
        max_radii = !centerline.max_radii.is_empty(),
        vesicle_counts = !centerline.vesicle_counts.is_empty(),
        area_sums = !centerline.area_sums.is_empty(),
        "Centerline arrays"
    );
}

/// Debug line at every tenth of `total` and at the end.
pub fn log_progress(stage: &str, finished: usize, total: usize) {
    let step = (total / 10).max(1);
    if finished % step != 0 && finished != total {
        return;
    }
    debug!(
        target: "centerline::progress",
        stage,
        finished,
        total,
        "{}/{} vertices",
        finished,
        total
    );
}

/// Record the outcome of a file operation.
pub fn log_io<T, E: Display>(operation: &str, path: &Path, result: &Result<T, E>) {
    match result {
        Ok(_) => debug!(
            target: "centerline::io",
            operation,
            path = %path.display(),
            "ok"
        ),
        Err(e) => warn!(
            target: "centerline::io",
            operation,
            path = %path.display(),
            error = %e,
            "failed"
        ),
    }
}
