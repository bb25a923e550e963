//! centerline project command - vesicle counts and surface area per vertex.

use std::path::Path;

use anyhow::{Context, Result, bail};
use centerline::{Report, component_centers};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::{read_centerline, read_mesh};
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ProjectResult {
    centerline: String,
    points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    vesicles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    busiest_vertex: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projected_area: Option<f64>,
}

pub fn run(
    centerline_path: &Path,
    vesicles: Option<&Path>,
    surface: Option<&Path>,
    output_path: Option<&Path>,
    cli: &Cli,
) -> Result<()> {
    if vesicles.is_none() && surface.is_none() {
        bail!("Nothing to project: pass --vesicles and/or --surface");
    }

    let mut line = read_centerline(centerline_path)?;

    if let Some(path) = vesicles {
        let centers = component_centers(&read_mesh(path)?);
        info!(vesicles = centers.len(), "Found vesicle centers");
        line.project_vesicles(&centers)?;
    }
    if let Some(path) = surface {
        line.project_surface(&read_mesh(path)?)?;
    }

    if let Some(path) = output_path {
        Report::from_centerline(&line)?
            .save(path)
            .with_context(|| format!("Failed to save report to {:?}", path))?;
    }

    let counts = &line.vesicle_counts;
    let result = ProjectResult {
        centerline: centerline_path.display().to_string(),
        points: line.len(),
        vesicles: (!counts.is_empty()).then(|| counts.iter().sum()),
        busiest_vertex: counts
            .iter()
            .enumerate()
            .max_by_key(|&(i, &c)| (c, std::cmp::Reverse(i)))
            .map(|(i, _)| i),
        projected_area: (!line.area_sums.is_empty()).then(|| line.area_sums.iter().sum()),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Projection".bold().underline());
                println!("  {}: {}", "Centerline".cyan(), result.centerline);
                println!("  {}: {}", "Vertices".cyan(), result.points);
                if let Some(n) = result.vesicles {
                    println!("  {}: {}", "Vesicles".cyan(), n);
                }
                if let Some(i) = result.busiest_vertex {
                    println!("  {}: {} ({} vesicles)", "Busiest vertex".cyan(), i, counts[i]);
                }
                if let Some(area) = result.projected_area {
                    println!("  {}: {:.4}", "Projected area".cyan(), area);
                }
                if let Some(path) = output_path {
                    output::success(
                        &format!("Report saved to {}", path.display()),
                        cli.format,
                        cli.quiet,
                    );
                }
            }
        }
    }

    Ok(())
}
