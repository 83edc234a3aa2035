//! TOML configuration of the `zones` command.
//!
//! ```toml
//! [cells]
//! code_column = "CODE_IRIS"
//!
//! [points]
//! environment_column = "Statut"
//!
//! [environments]
//! "com > 200 m habts" = { radius_km = 1.0 }
//! "com rurale < 2 000 m habts" = { radius_km = 9.0 }
//! ```
//!
//! Every section is optional.

use std::path::Path;

use chalandise_geography::PointColumns;
use chalandise_geography_models::CELL_CODE_COLUMN;
use chalandise_zones_models::EnvironmentParameters;
use serde::Deserialize;

use crate::CliError;

/// Radii used when the configuration has no `[environments]` table.
pub const DEFAULT_ENVIRONMENTS: &[(&str, f64)] = &[
    ("com > 200 m habts", 1.0),
    ("com < 200 m habts", 2.0),
    ("com < 50 m habts", 3.0),
    ("com < 10 m habts", 5.0),
    ("com rurale > 2 000 habts", 7.0),
    ("com rurale < 2 000 m habts", 9.0),
];

/// Settings of the statistical cell layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CellsConfig {
    /// Cell code property / column shared by both cell files.
    pub code_column: String,
}

impl Default for CellsConfig {
    fn default() -> Self {
        Self {
            code_column: CELL_CODE_COLUMN.to_string(),
        }
    }
}

/// Full configuration of a `zones` run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Cell layer settings.
    pub cells: CellsConfig,
    /// Points CSV column names.
    pub points: PointColumns,
    /// Catchment radius per environment class.
    pub environments: EnvironmentParameters,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            cells: CellsConfig::default(),
            points: PointColumns::default(),
            environments: EnvironmentParameters::from_radii(DEFAULT_ENVIRONMENTS.iter().copied()),
        }
    }
}

impl ZonesConfig {
    /// Reads the configuration from `path`, or the defaults when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read or is not
    /// valid TOML for this layout.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let Some(path) = path else {
            log::info!("No configuration given, using built-in defaults");
            return Ok(Self::default());
        };

        let config_error = |message: String| CliError::Config {
            path: path.display().to_string(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config = Self::from_toml_str(&contents).map_err(config_error)?;

        log::info!(
            "Loaded configuration from {} ({} environment classes: {})",
            path.display(),
            config.environments.len(),
            config.environments.classes().collect::<Vec<_>>().join(", ")
        );
        Ok(config)
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    ///
    /// Returns the TOML parser message on failure.
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }
}
