//! centerline approx command - centerline from two surface vertices.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::save_centerline;
use centerline::{CenterlineConfig, approximate_centerline};
use serde::Serialize;

use super::{mesh_name, read_mesh};
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ApproxResult {
    output: String,
    start: usize,
    end: usize,
    coarse_points: usize,
    points: usize,
    length: f64,
}

pub fn run(
    mesh_path: &Path,
    start: usize,
    end: usize,
    output_path: &Path,
    points: Option<usize>,
    config: &CenterlineConfig,
    cli: &Cli,
) -> Result<()> {
    let mesh = read_mesh(mesh_path)?;
    let coarse = approximate_centerline(
        &mesh_name(mesh_path),
        &mesh,
        start,
        end,
        &config.sections,
        &config.approx,
    )?;
    let target = points.unwrap_or(config.approx.target_points);
    let line = coarse.refine(target, config.approx.smoothing)?;

    save_centerline(&line, output_path)
        .with_context(|| format!("Failed to save centerline to {:?}", output_path))?;

    let result = ApproxResult {
        output: output_path.display().to_string(),
        start,
        end,
        coarse_points: coarse.len(),
        points: line.len(),
        length: line.total_length(),
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => output::success(
            &format!(
                "Approximate centerline ({} points, length {:.3}) saved to {}",
                result.points, result.length, result.output
            ),
            cli.format,
            cli.quiet,
        ),
    }

    Ok(())
}
