//! centerline boutons command - mark swellings along a centerline.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::{
    BoutonMarker, CenterlineConfig, MarkerKind, SectionEngine, min_radius_markers,
};
use colored::Colorize;
use serde::Serialize;

use super::{mesh_name, read_centerline, read_mesh, section_params};
use crate::{Cli, OutputFormat, output};

pub struct Args<'a> {
    pub mesh: &'a Path,
    pub centerline: &'a Path,
    pub output: Option<&'a Path>,
    pub window: Option<f64>,
    pub ratio: Option<f64>,
    pub max_radius: Option<f64>,
    pub min_radius: bool,
    pub search_radius: Option<f64>,
}

#[derive(Serialize)]
struct BoutonsResult {
    mesh: String,
    points: usize,
    increases: usize,
    decreases: usize,
    large_radius: usize,
    markers: Vec<BoutonMarker>,
}

pub fn run(args: &Args<'_>, config: &CenterlineConfig, cli: &Cli) -> Result<()> {
    let mut params = config.bouton.clone();
    if let Some(window) = args.window {
        params.distance_window = window;
    }
    if let Some(ratio) = args.ratio {
        params.area_change_ratio = ratio;
    }
    if let Some(max_radius) = args.max_radius {
        params.max_radius_threshold = max_radius;
    }
    params.validate()?;

    let mesh = read_mesh(args.mesh)?;
    let mut line = read_centerline(args.centerline)?;
    let engine = SectionEngine::new(
        mesh_name(args.mesh),
        &mesh,
        section_params(config, args.search_radius, false),
    )?;
    engine.compute(&mut line, None)?;

    let mut markers = line.detect_boutons(&params)?;
    if args.min_radius {
        if line.min_radii.is_empty() {
            output::warning(
                "Centerline has no minimum radii; skipping minimum-radius markers",
                cli.quiet,
            );
        } else {
            markers.extend(min_radius_markers(&line.points, &line.min_radii));
        }
    }

    let count = |kind: MarkerKind| markers.iter().filter(|m| m.kind == kind).count();
    let result = BoutonsResult {
        mesh: args.mesh.display().to_string(),
        points: line.len(),
        increases: count(MarkerKind::Increase),
        decreases: count(MarkerKind::Decrease),
        large_radius: count(MarkerKind::LargeRadius),
        markers,
    };

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&result.markers)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write markers to {:?}", path))?;
    }

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Bouton Markers".bold().underline());
                println!("  {}: {}", "Mesh".cyan(), result.mesh);
                println!("  {}: {}", "Vertices".cyan(), result.points);
                println!("  {}: {}", "Area increases".cyan(), result.increases);
                println!("  {}: {}", "Area decreases".cyan(), result.decreases);
                println!(
                    "  {}: {} (above {})",
                    "Large radius".cyan(),
                    result.large_radius,
                    params.max_radius_threshold
                );
                for m in result.markers.iter().filter(|m| m.kind != MarkerKind::MinRadius) {
                    println!(
                        "    {} {:>5} at ({:.3}, {:.3}, {:.3})",
                        "•".green(),
                        m.index,
                        m.position[0],
                        m.position[1],
                        m.position[2]
                    );
                }
                if let Some(path) = args.output {
                    output::success(
                        &format!("Markers saved to {}", path.display()),
                        cli.format,
                        cli.quiet,
                    );
                }
            }
        }
    }

    Ok(())
}
