#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading of statistical cells and service points.
//!
//! Cells come from a `GeoJSON` polygon layer left-joined with a
//! demographics CSV on the cell code. Service points come from a CSV whose
//! column names are configurable.

pub mod cells;
pub mod points;

pub use cells::{
    Demographics, join_demographics, load_cells, parse_cells_geojson, parse_demographics_csv,
    read_demographics,
};
pub use points::{PointColumns, load_points, parse_points_csv, read_points};

use thiserror::Error;

/// Errors that can occur while loading cells or points.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A CSV file is malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A `GeoJSON` document is malformed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// A required column is absent.
    #[error("Column '{column}' missing from {source_name}")]
    MissingColumn {
        /// The expected column name.
        column: String,
        /// What was being read.
        source_name: String,
    },

    /// A cell feature carries no code.
    #[error("Feature #{feature} has no '{column}' property")]
    MissingCellId {
        /// Zero-based feature position in the collection.
        feature: usize,
        /// The code property name.
        column: String,
    },

    /// The `GeoJSON` document is not a feature collection.
    #[error("Unsupported GeoJSON layout: {message}")]
    UnsupportedGeometry {
        /// Description of what was found.
        message: String,
    },
}

impl From<geojson::Error> for LoadError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}

/// Reads a whole file to a string.
fn read_to_string(path: &std::path::Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Opens a CSV file with the settings shared by every loader.
fn open_csv(path: &std::path::Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(csv_reader(file))
}

fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parses a numeric field, accepting a decimal comma. Empty and
/// non-numeric values are `None`.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>()
        .or_else(|_| raw.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|v| v.is_finite())
}
