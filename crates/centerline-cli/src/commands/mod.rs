//! Command implementations.

pub mod approx;
pub mod boutons;
pub mod check;
pub mod extract;
pub mod project;
pub mod resample;
pub mod sections;
pub mod trim;

use std::path::Path;

use anyhow::{Context, Result};
use centerline::io::{load_centerline, load_mesh};
use centerline::{Centerline, CenterlineConfig, Mesh, SectionParams};

use crate::Cli;

/// Parameters from `--config`, or the defaults.
pub fn load_config(cli: &Cli) -> Result<CenterlineConfig> {
    match &cli.config {
        Some(path) => CenterlineConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(CenterlineConfig::default()),
    }
}

/// Mesh identifier used in logs and errors: the file stem.
pub fn mesh_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh")
        .to_string()
}

pub fn read_mesh(path: &Path) -> Result<Mesh> {
    load_mesh(path).with_context(|| format!("Failed to load mesh from {:?}", path))
}

pub fn read_centerline(path: &Path) -> Result<Centerline> {
    load_centerline(path).with_context(|| format!("Failed to load centerline from {:?}", path))
}

/// Section parameters from the config with command-line overrides applied.
pub fn section_params(
    config: &CenterlineConfig,
    search_radius: Option<f64>,
    parallel: bool,
) -> SectionParams {
    let mut params = config.sections.clone();
    if let Some(radius) = search_radius {
        params.search_radius = radius;
    }
    if parallel {
        params.parallel = true;
    }
    params
}
