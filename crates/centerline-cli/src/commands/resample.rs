//! centerline resample command - even arc-length spacing.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::save_centerline;
use serde::Serialize;

use super::read_centerline;
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ResampleResult {
    input: String,
    output: String,
    requested: usize,
    input_points: usize,
    output_points: usize,
    length: f64,
}

pub fn run(input: &Path, output_path: &Path, points: usize, cli: &Cli) -> Result<()> {
    let line = read_centerline(input)?;
    let resampled = line.resample(points)?;
    save_centerline(&resampled, output_path)
        .with_context(|| format!("Failed to save centerline to {:?}", output_path))?;

    let result = ResampleResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        requested: points,
        input_points: line.len(),
        output_points: resampled.len(),
        length: resampled.total_length(),
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            output::success(
                &format!(
                    "Resampled {} -> {} points, saved to {}",
                    result.input_points, result.output_points, result.output
                ),
                cli.format,
                cli.quiet,
            );
            if result.output_points != result.requested {
                output::warning(
                    &format!(
                        "Requested {} points; the source spacing allowed {}",
                        result.requested, result.output_points
                    ),
                    cli.quiet,
                );
            }
        }
    }

    Ok(())
}
