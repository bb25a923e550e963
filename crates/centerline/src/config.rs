//! Serializable run configuration.
//!
//! `CenterlineConfig` gathers every tunable of the pipeline so a run can be
//! reproduced from a file. Missing keys fall back to their defaults.
//!
//! # Example TOML
//!
//! ```toml
//! resample_points = 300
//!
//! [sections]
//! search_radius = 0.8
//! parallel = true
//!
//! [sections.ladder]
//! give_up_above = 0.05
//!
//! [bouton]
//! distance_window = 0.3
//! area_change_ratio = 1.5
//! ```

use std::path::Path;

use crate::approximate::ApproxParams;
use crate::bouton::BoutonParams;
use crate::error::{CenterlineError, CenterlineResult};
use crate::metrics::SectionParams;

/// Every tunable of the pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CenterlineConfig {
    /// Point count for resampling an external centerline.
    pub resample_points: usize,
    pub sections: SectionParams,
    pub bouton: BoutonParams,
    pub approx: ApproxParams,
}

impl Default for CenterlineConfig {
    fn default() -> Self {
        Self {
            resample_points: 200,
            sections: SectionParams::default(),
            bouton: BoutonParams::default(),
            approx: ApproxParams::default(),
        }
    }
}

impl CenterlineConfig {
    pub fn validate(&self) -> CenterlineResult<()> {
        self.sections.validate()?;
        self.bouton.validate()?;
        self.approx.validate()?;
        if self.resample_points < 2 {
            return Err(CenterlineError::invalid_config(format!(
                "resample_points must be at least 2, got {}",
                self.resample_points
            )));
        }
        Ok(())
    }

    /// Parse TOML and validate.
    pub fn from_toml(toml_str: &str) -> CenterlineResult<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| CenterlineError::invalid_config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> CenterlineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CenterlineError::invalid_config(format!("TOML serialize error: {}", e)))
    }

    /// Parse JSON and validate.
    pub fn from_json(json_str: &str) -> CenterlineResult<Self> {
        let config: Self = serde_json::from_str(json_str)
            .map_err(|e| CenterlineError::invalid_config(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> CenterlineResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CenterlineError::invalid_config(format!("JSON serialize error: {}", e)))
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> CenterlineResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| CenterlineError::io_read(path, e))?;
        if is_json(path) {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Save to a `.toml` or `.json` file.
    pub fn save(&self, path: impl AsRef<Path>) -> CenterlineResult<()> {
        let path = path.as_ref();
        let text = if is_json(path) {
            self.to_json()?
        } else {
            self.to_toml()?
        };
        std::fs::write(path, text).map_err(|e| CenterlineError::io_write(path, e))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
