//! Service point loading from CSV.

use std::io::Read;
use std::path::Path;

use chalandise_geography_models::{LatLon, ServicePoint};
use serde::{Deserialize, Serialize};

use crate::{LoadError, csv_reader, open_csv, parse_number};

/// Column names of the points CSV.
///
/// Defaults match the agency exports the tool was built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointColumns {
    /// Point identifier.
    pub id_column: String,
    /// Display name.
    pub name_column: String,
    /// Latitude in WGS84 degrees.
    pub latitude_column: String,
    /// Longitude in WGS84 degrees.
    pub longitude_column: String,
    /// Environment class label.
    pub environment_column: String,
    /// Street address, read when present.
    pub address_column: Option<String>,
    /// Municipality, read when present.
    pub locality_column: Option<String>,
}

impl Default for PointColumns {
    fn default() -> Self {
        Self {
            id_column: "Code agence".to_string(),
            name_column: "Nom d'enseigne".to_string(),
            latitude_column: "Latitude".to_string(),
            longitude_column: "Longitude".to_string(),
            environment_column: "Statut".to_string(),
            address_column: Some("Adresse".to_string()),
            locality_column: Some("Commune".to_string()),
        }
    }
}

/// Header positions resolved against [`PointColumns`].
struct ColumnIndexes {
    id: usize,
    name: usize,
    latitude: usize,
    longitude: usize,
    environment: usize,
    address: Option<usize>,
    locality: Option<usize>,
}

impl ColumnIndexes {
    fn resolve(headers: &csv::StringRecord, columns: &PointColumns) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
                source_name: "points CSV".to_string(),
            })
        };

        Ok(Self {
            id: require(&columns.id_column)?,
            name: require(&columns.name_column)?,
            latitude: require(&columns.latitude_column)?,
            longitude: require(&columns.longitude_column)?,
            environment: require(&columns.environment_column)?,
            address: columns.address_column.as_deref().and_then(find),
            locality: columns.locality_column.as_deref().and_then(find),
        })
    }
}

/// Loads service points from a CSV file.
///
/// # Errors
///
/// * [`LoadError::Io`] if the file cannot be opened
/// * [`LoadError::MissingColumn`] if a required column is absent
/// * [`LoadError::Csv`] if the CSV is malformed
pub fn load_points(path: &Path, columns: &PointColumns) -> Result<Vec<ServicePoint>, LoadError> {
    log::info!("Loading service points from {}", path.display());
    let points = read_points(open_csv(path)?, columns)?;
    log::info!("Loaded {} service points", points.len());
    Ok(points)
}

/// Reads service points from an open CSV reader.
///
/// Rows with an empty identifier, name or environment class, or with
/// unparseable coordinates, are dropped and counted in a warning.
///
/// # Errors
///
/// Returns [`LoadError::MissingColumn`] if a required column is absent, or
/// [`LoadError::Csv`] if the CSV is malformed.
pub fn read_points<R: Read>(
    mut reader: csv::Reader<R>,
    columns: &PointColumns,
) -> Result<Vec<ServicePoint>, LoadError> {
    let indexes = ColumnIndexes::resolve(reader.headers()?, columns)?;

    let mut points = Vec::new();
    let mut dropped = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if let Some(point) = parse_row(&record, &indexes) {
            points.push(point);
        } else {
            log::trace!("Dropping points row {}: missing required field", row + 2);
            dropped += 1;
        }
    }

    if dropped > 0 {
        log::warn!("Dropped {dropped} point rows with missing or invalid required fields");
    }

    Ok(points)
}

/// Convenience wrapper around [`read_points`] for in-memory data.
///
/// # Errors
///
/// See [`read_points`].
pub fn parse_points_csv(csv: &str, columns: &PointColumns) -> Result<Vec<ServicePoint>, LoadError> {
    read_points(csv_reader(csv.as_bytes()), columns)
}

fn parse_row(record: &csv::StringRecord, indexes: &ColumnIndexes) -> Option<ServicePoint> {
    let text = |i: usize| record.get(i).filter(|v| !v.is_empty()).map(str::to_string);

    Some(ServicePoint {
        id: text(indexes.id)?,
        name: text(indexes.name)?,
        location: LatLon::new(
            parse_number(record.get(indexes.latitude)?)?,
            parse_number(record.get(indexes.longitude)?)?,
        ),
        environment_class: text(indexes.environment)?,
        address: indexes.address.and_then(text),
        locality: indexes.locality.and_then(text),
    })
}
