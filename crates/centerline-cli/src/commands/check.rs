//! centerline check command - surface checks before analysis.

use std::path::Path;

use anyhow::Result;
use centerline::{MIN_FACES_PER_VERTEX, SurfaceReport, check_surface};
use colored::Colorize;
use serde::Serialize;

use super::read_mesh;
use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct CheckResult {
    path: String,
    clean: bool,
    report: SurfaceReport,
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let mesh = read_mesh(input)?;
    let report = check_surface(&mesh);
    let result = CheckResult {
        path: input.display().to_string(),
        clean: report.is_clean(),
        report,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let r = &result.report;
                println!("{}", "Surface Check".bold().underline());
                println!("  {}: {}", "File".cyan(), result.path);
                println!("  {}: {}", "Vertices".cyan(), r.vertex_count);
                println!(
                    "  {}: {} (largest has {} vertices)",
                    "Faces".cyan(),
                    r.face_count,
                    r.max_face_vertices
                );
                println!("  {}: {:.4}", "Surface area".cyan(), r.surface_area);

                if result.clean {
                    println!("  {}: {}", "Status".cyan(), "Clean".green().bold());
                } else {
                    println!("  {}: {}", "Status".cyan(), "Issues found".red().bold());
                    println!("\n{}", "Issues:".bold());
                    if r.component_count != 1 {
                        println!("  {} {} components", "✗".red(), r.component_count);
                    }
                    if r.boundary_edge_count > 0 {
                        println!("  {} {} boundary edges", "✗".red(), r.boundary_edge_count);
                    }
                    if r.non_manifold_edge_count > 0 {
                        println!(
                            "  {} {} non-manifold edges",
                            "✗".red(),
                            r.non_manifold_edge_count
                        );
                    }
                    if !r.hanging_vertices.is_empty() {
                        println!(
                            "  {} {} vertices in fewer than {} faces",
                            "⚠".yellow(),
                            r.hanging_vertices.len(),
                            MIN_FACES_PER_VERTEX
                        );
                    }
                    if r.non_finite_vertices > 0 {
                        println!(
                            "  {} {} vertices with non-finite coordinates",
                            "✗".red(),
                            r.non_finite_vertices
                        );
                    }
                }
            }
        }
    }

    if !result.clean {
        std::process::exit(1);
    }

    Ok(())
}
