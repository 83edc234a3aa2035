#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result export for the `chalandise` command-line tool.

pub mod config;
pub mod export;

use thiserror::Error;

/// Errors raised by the command-line tool.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be read or parsed.
    #[error("Invalid configuration {path}: {message}")]
    Config {
        /// Configuration file path.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Writing an output file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input data could not be loaded.
    #[error(transparent)]
    Load(#[from] chalandise_geography::LoadError),

    /// The cell index could not be built.
    #[error(transparent)]
    Spatial(#[from] chalandise_spatial::SpatialError),
}
