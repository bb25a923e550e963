//! centerline extract command - capped surface between two centerline vertices.

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::save_mesh;
use centerline::{CenterlineConfig, SectionEngine};
use colored::Colorize;
use serde::Serialize;

use super::{mesh_name, read_centerline, read_mesh, section_params};
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ExtractResult {
    output: String,
    start: usize,
    end: usize,
    faces: usize,
    lateral_area: f64,
    start_area: f64,
    end_area: f64,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    mesh_path: &Path,
    centerline_path: &Path,
    from: usize,
    to: usize,
    output_path: &Path,
    search_radius: Option<f64>,
    config: &CenterlineConfig,
    cli: &Cli,
) -> Result<()> {
    let mesh = read_mesh(mesh_path)?;
    let line = read_centerline(centerline_path)?;
    let engine = SectionEngine::new(
        mesh_name(mesh_path),
        &mesh,
        section_params(config, search_radius, false),
    )?;

    let segment = engine.extract_segment(&line.points, from, to)?;
    let capped = segment.to_mesh();
    save_mesh(&capped, output_path)
        .with_context(|| format!("Failed to save segment to {:?}", output_path))?;

    let result = ExtractResult {
        output: output_path.display().to_string(),
        start: segment.start,
        end: segment.end,
        faces: capped.face_count(),
        lateral_area: segment.lateral_area(),
        start_area: segment.start_cap.area,
        end_area: segment.end_cap.area,
    };

    match cli.format {
        OutputFormat::Json => output::print(&result, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Segment".bold().underline());
                println!("  {}: {} to {}", "Vertices".cyan(), result.start, result.end);
                println!("  {}: {}", "Faces".cyan(), result.faces);
                println!("  {}: {:.4}", "Lateral area".cyan(), result.lateral_area);
                println!(
                    "  {}: {:.4} / {:.4}",
                    "Cap areas".cyan(),
                    result.start_area,
                    result.end_area
                );
                output::success(
                    &format!("Segment saved to {}", result.output),
                    cli.format,
                    cli.quiet,
                );
            }
        }
    }

    Ok(())
}
