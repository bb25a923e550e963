//! centerline sections command - cross-sections and the per-vertex report.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::save_sections;
use centerline::{CenterlineConfig, Report, SectionEngine, check_surface};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::{mesh_name, read_centerline, read_mesh, section_params};
use crate::{Cli, OutputFormat, output};

pub struct Args<'a> {
    pub mesh: &'a Path,
    pub centerline: &'a Path,
    pub output: Option<&'a Path>,
    pub sections_out: Option<&'a Path>,
    pub search_radius: Option<f64>,
    pub resample: Option<usize>,
    pub trim: bool,
    pub parallel: bool,
}

#[derive(Serialize)]
struct SectionsResult {
    mesh: String,
    centerline: String,
    points: usize,
    trimmed: Vec<usize>,
    length: f64,
    search_radius: f64,
    degenerate: usize,
    with_holes: usize,
    retried: usize,
    min_area: f64,
    max_area: f64,
    mean_area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<String>,
}

pub fn run(args: &Args<'_>, config: &CenterlineConfig, cli: &Cli) -> Result<()> {
    let mesh = read_mesh(args.mesh)?;
    let surface = check_surface(&mesh);
    if !surface.is_clean() {
        output::warning(
            &format!(
                "{} is not a clean closed surface; run `centerline check` for details",
                args.mesh.display()
            ),
            cli.quiet,
        );
    }

    let mut line = read_centerline(args.centerline)?;
    let trimmed = if args.trim {
        line.trim_endpoints_outside(&mesh)
            .context("Failed to trim centerline end points")?
    } else {
        Vec::new()
    };
    if !trimmed.is_empty() {
        info!(removed = ?trimmed, "Trimmed centerline end points");
    }
    if let Some(points) = args.resample {
        line = line.resample(points).context("Failed to resample centerline")?;
        info!(requested = points, actual = line.len(), "Resampled centerline");
    }

    let params = section_params(config, args.search_radius, args.parallel);
    let search_radius = params.search_radius;
    let engine = SectionEngine::new(mesh_name(args.mesh), &mesh, params)?;
    let stats = engine.compute(&mut line, None)?;

    if let Some(path) = args.output {
        Report::from_centerline(&line)?
            .save(path)
            .with_context(|| format!("Failed to save report to {:?}", path))?;
    }
    if let Some(path) = args.sections_out {
        save_sections(&line, path)
            .with_context(|| format!("Failed to save cross-sections to {:?}", path))?;
    }

    let areas = &line.cross_sectional_areas;
    let result = SectionsResult {
        mesh: args.mesh.display().to_string(),
        centerline: args.centerline.display().to_string(),
        points: line.len(),
        trimmed,
        length: line.total_length(),
        search_radius,
        degenerate: stats.degenerate,
        with_holes: stats.with_holes,
        retried: stats.retried,
        min_area: areas.iter().copied().fold(f64::INFINITY, f64::min),
        max_area: areas.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_area: areas.iter().sum::<f64>() / areas.len().max(1) as f64,
        report: args.output.map(|p| p.display().to_string()),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Cross-Sections".bold().underline());
                println!("  {}: {}", "Mesh".cyan(), result.mesh);
                println!("  {}: {}", "Centerline".cyan(), result.centerline);
                if !result.trimmed.is_empty() {
                    println!("  {}: {:?}", "Trimmed".yellow(), result.trimmed);
                }
                println!(
                    "  {}: {} over length {:.3}",
                    "Vertices".cyan(),
                    result.points,
                    result.length
                );
                println!(
                    "  {}: {:.4} / {:.4} / {:.4}",
                    "Area min/mean/max".cyan(),
                    result.min_area,
                    result.mean_area,
                    result.max_area
                );
                if result.with_holes > 0 {
                    println!("  {}: {}", "With holes".cyan(), result.with_holes);
                }
                if result.retried > 0 {
                    println!("  {}: {}", "Retried cuts".cyan(), result.retried);
                }
                if result.degenerate > 0 {
                    println!(
                        "  {}: {} (accepted after the tolerance ladder gave up)",
                        "Degenerate".yellow(),
                        result.degenerate
                    );
                }
                if let Some(ref report) = result.report {
                    output::success(&format!("Report saved to {}", report), cli.format, cli.quiet);
                }
            }
        }
    }

    Ok(())
}
