//! centerline trim command - drop end points outside the mesh.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::save_centerline;
use colored::Colorize;
use serde::Serialize;

use super::{read_centerline, read_mesh};
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct TrimResult {
    output: String,
    removed: Vec<usize>,
    remaining: usize,
}

pub fn run(mesh_path: &Path, centerline_path: &Path, output_path: &Path, cli: &Cli) -> Result<()> {
    let mesh = read_mesh(mesh_path)?;
    let mut line = read_centerline(centerline_path)?;
    let removed = line.trim_endpoints_outside(&mesh)?;
    save_centerline(&line, output_path)
        .with_context(|| format!("Failed to save centerline to {:?}", output_path))?;

    let result = TrimResult {
        output: output_path.display().to_string(),
        removed,
        remaining: line.len(),
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                if result.removed.is_empty() {
                    println!("  {}", "All end points are inside the mesh".green());
                } else {
                    println!("  {}: {:?}", "Removed".yellow(), result.removed);
                }
                output::success(
                    &format!("{} points saved to {}", result.remaining, result.output),
                    cli.format,
                    cli.quiet,
                );
            }
        }
    }

    Ok(())
}
