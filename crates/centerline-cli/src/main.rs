//! centerline: cross-section analysis of tubular meshes from the command line.
//!
//! Computes per-vertex cross-sectional areas along a centerline through a neurite
//! or vessel mesh, marks boutons, projects vesicles and surface area, and writes
//! the semicolon-delimited report.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=centerline=info` - Stage summaries
//! - `RUST_LOG=centerline=debug` - Per-vertex detail
//! - `RUST_LOG=centerline::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Cross-sections and report for one axon
//! centerline sections axon.obj axon_centerline.vtp -o axon_report.txt
//!
//! # Same run with parameters from a file
//! centerline --config run.toml -v sections axon.obj axon_centerline.vtp -o axon_report.txt
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{approx, boutons, check, extract, project, resample, sections, trim};

/// centerline - Cross-sectional geometry along tubular surface meshes.
///
/// Cut a closed mesh perpendicular to its centerline at every vertex and measure
/// areas, radii, swellings and projected quantities.
#[derive(Parser)]
#[command(name = "centerline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Parameter file (.toml or .json); command-line flags override its values
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute cross-sections and write the per-vertex report
    Sections {
        /// Surface mesh (OBJ, STL, VTP)
        mesh: PathBuf,

        /// Centerline (VTP, TXT, XYZ)
        centerline: PathBuf,

        /// Report file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write all cross-section polygons to this mesh file
        #[arg(long)]
        sections_out: Option<PathBuf>,

        /// Half-width of the cutting patch and radius of the copied region
        #[arg(long)]
        search_radius: Option<f64>,

        /// Resample the centerline to this many points first
        #[arg(long)]
        resample: Option<usize>,

        /// Remove centerline end points outside the mesh first
        #[arg(long)]
        trim: bool,

        /// Compute vertices in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Mark swellings and large-radius vertices
    Boutons {
        /// Surface mesh
        mesh: PathBuf,

        /// Centerline
        centerline: PathBuf,

        /// Write markers as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Arc-length window for area changes
        #[arg(long)]
        window: Option<f64>,

        /// Area ratio counted as a change
        #[arg(long)]
        ratio: Option<f64>,

        /// Max radius above which a vertex is marked
        #[arg(long)]
        max_radius: Option<f64>,

        /// Also emit one marker per vertex sized by its minimum radius
        #[arg(long)]
        min_radius: bool,

        #[arg(long)]
        search_radius: Option<f64>,
    },

    /// Project vesicle centers and surface area onto the centerline
    Project {
        /// Centerline
        centerline: PathBuf,

        /// Mesh of vesicle spheres, one loose part per vesicle
        #[arg(long)]
        vesicles: Option<PathBuf>,

        /// Surface whose face areas are summed per vertex
        #[arg(long)]
        surface: Option<PathBuf>,

        /// Report file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resample a centerline evenly by arc length
    Resample {
        /// Centerline
        input: PathBuf,

        /// Output centerline (VTP or text)
        #[arg(short, long)]
        output: PathBuf,

        /// Target point count
        #[arg(long, short = 'n')]
        points: Option<usize>,
    },

    /// Remove centerline end points lying outside the mesh
    Trim {
        /// Surface mesh
        mesh: PathBuf,

        /// Centerline
        centerline: PathBuf,

        /// Output centerline
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build an approximate centerline between two surface vertices
    Approx {
        /// Surface mesh
        mesh: PathBuf,

        /// Vertex index at one end of the tube
        #[arg(long)]
        start: usize,

        /// Vertex index at the other end
        #[arg(long)]
        end: usize,

        /// Output centerline
        #[arg(short, long)]
        output: PathBuf,

        /// Refine to about this many points
        #[arg(long)]
        points: Option<usize>,
    },

    /// Cut out the capped surface between two centerline vertices
    Extract {
        /// Surface mesh
        mesh: PathBuf,

        /// Centerline
        centerline: PathBuf,

        /// First centerline vertex
        #[arg(long)]
        from: usize,

        /// Second centerline vertex
        #[arg(long)]
        to: usize,

        /// Output mesh (OBJ or VTP)
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        search_radius: Option<f64>,
    },

    /// Check that a surface suits cross-section analysis
    Check {
        /// Surface mesh
        mesh: PathBuf,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "centerline=warn",
            1 => "centerline=info",
            2 => "centerline=debug",
            _ => "centerline=trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = commands::load_config(&cli).and_then(|config| match &cli.command {
        Commands::Sections {
            mesh,
            centerline,
            output,
            sections_out,
            search_radius,
            resample,
            trim,
            parallel,
        } => sections::run(
            &sections::Args {
                mesh,
                centerline,
                output: output.as_deref(),
                sections_out: sections_out.as_deref(),
                search_radius: *search_radius,
                resample: *resample,
                trim: *trim,
                parallel: *parallel,
            },
            &config,
            &cli,
        ),
        Commands::Boutons {
            mesh,
            centerline,
            output,
            window,
            ratio,
            max_radius,
            min_radius,
            search_radius,
        } => boutons::run(
            &boutons::Args {
                mesh,
                centerline,
                output: output.as_deref(),
                window: *window,
                ratio: *ratio,
                max_radius: *max_radius,
                min_radius: *min_radius,
                search_radius: *search_radius,
            },
            &config,
            &cli,
        ),
        Commands::Project {
            centerline,
            vesicles,
            surface,
            output,
        } => project::run(
            centerline,
            vesicles.as_deref(),
            surface.as_deref(),
            output.as_deref(),
            &cli,
        ),
        Commands::Resample {
            input,
            output,
            points,
        } => resample::run(input, output, points.unwrap_or(config.resample_points), &cli),
        Commands::Trim {
            mesh,
            centerline,
            output,
        } => trim::run(mesh, centerline, output, &cli),
        Commands::Approx {
            mesh,
            start,
            end,
            output,
            points,
        } => approx::run(mesh, *start, *end, output, *points, &config, &cli),
        Commands::Extract {
            mesh,
            centerline,
            from,
            to,
            output,
            search_radius,
        } => extract::run(mesh, centerline, *from, *to, output, *search_radius, &config, &cli),
        Commands::Check { mesh } => check::run(mesh, &cli),
    });

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(err) = e.downcast_ref::<centerline::CenterlineError>() {
                eprintln!("{}: {}", "Error".red().bold(), err);
                eprintln!("  {}: {}", "Code".cyan(), err.code());
                eprintln!("  {}: {}", "Category".cyan(), err.category());
                eprintln!("  {}: {}", "Suggestion".green(), err.recovery_suggestion());
                if let Some(location) = err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
