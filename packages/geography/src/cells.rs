//! Statistical cell loading.
//!
//! Geometries come from a `GeoJSON` `FeatureCollection` in WGS84; the
//! demographic attributes from a CSV keyed by the same cell code. The two
//! are left-joined on the code: cells without a demographics row keep only
//! the numeric properties of their feature.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chalandise_geography_models::StatisticalCell;
use geo::MultiPolygon;
use geojson::GeoJson;

use crate::{LoadError, csv_reader, open_csv, parse_number, read_to_string};

/// Numeric attributes per cell code.
pub type Demographics = BTreeMap<String, BTreeMap<String, f64>>;

/// Loads the cell geometries and joins the demographics onto them.
///
/// # Errors
///
/// * [`LoadError::Io`] if either file cannot be read
/// * [`LoadError::MissingColumn`] if the demographics CSV has no
///   `code_column`
/// * [`LoadError::MissingCellId`] if a feature carries no code
/// * [`LoadError::GeoJson`] / [`LoadError::Csv`] on malformed input
pub fn load_cells(
    geometry_path: &Path,
    demographics_path: &Path,
    code_column: &str,
) -> Result<Vec<StatisticalCell>, LoadError> {
    log::info!("Loading cell geometries from {}", geometry_path.display());
    let mut cells = parse_cells_geojson(&read_to_string(geometry_path)?, code_column)?;

    log::info!("Loading cell demographics from {}", demographics_path.display());
    let demographics = read_demographics(open_csv(demographics_path)?, code_column)?;

    let joined = join_demographics(&mut cells, &demographics);
    if joined < cells.len() {
        log::warn!(
            "{} of {} cells have no demographics row",
            cells.len() - joined,
            cells.len()
        );
    }

    log::info!("Loaded {} cells", cells.len());
    Ok(cells)
}

/// Parses cells from a `GeoJSON` `FeatureCollection`.
///
/// Numeric properties become cell attributes. Features whose geometry is
/// missing or not (multi)polygonal are skipped with a warning.
///
/// # Errors
///
/// Returns [`LoadError::MissingCellId`] if a feature has no `code_column`
/// property, or [`LoadError::UnsupportedGeometry`] if the document is not a
/// feature collection.
pub fn parse_cells_geojson(
    geojson_str: &str,
    code_column: &str,
) -> Result<Vec<StatisticalCell>, LoadError> {
    let GeoJson::FeatureCollection(collection) = geojson_str.parse::<GeoJson>()? else {
        return Err(LoadError::UnsupportedGeometry {
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let mut cells = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for (position, feature) in collection.features.into_iter().enumerate() {
        let Some(cell_id) = feature.property(code_column).and_then(property_to_code) else {
            return Err(LoadError::MissingCellId {
                feature: position,
                column: code_column.to_string(),
            });
        };

        let Some(geometry) = feature.geometry.and_then(to_multipolygon) else {
            log::warn!("Skipping cell {cell_id}: geometry is not a polygon");
            skipped += 1;
            continue;
        };

        let mut cell = StatisticalCell::new(cell_id, geometry);
        if let Some(properties) = feature.properties {
            for (key, value) in properties {
                if key == code_column {
                    continue;
                }
                if let Some(number) = property_to_number(&value) {
                    cell.attributes.insert(key, number);
                }
            }
        }
        cells.push(cell);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} non-polygonal features");
    }

    Ok(cells)
}

/// Reads a demographics CSV into per-cell numeric attributes.
///
/// Empty or non-numeric values are left out for that cell. Rows without a
/// code are skipped; when a code repeats, the last row wins.
///
/// # Errors
///
/// Returns [`LoadError::MissingColumn`] if the header has no
/// `code_column`, or [`LoadError::Csv`] if the CSV is malformed.
pub fn read_demographics<R: Read>(
    mut reader: csv::Reader<R>,
    code_column: &str,
) -> Result<Demographics, LoadError> {
    let headers = reader.headers()?.clone();
    let Some(code_index) = headers.iter().position(|h| h == code_column) else {
        return Err(LoadError::MissingColumn {
            column: code_column.to_string(),
            source_name: "demographics CSV".to_string(),
        });
    };

    let mut demographics = Demographics::new();
    for record in reader.records() {
        let record = record?;
        let Some(code) = record.get(code_index).filter(|c| !c.is_empty()) else {
            log::trace!("Skipping demographics row without a cell code");
            continue;
        };

        let attributes = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != code_index)
            .filter_map(|(_, (name, raw))| Some((name.to_string(), parse_number(raw)?)))
            .collect();
        demographics.insert(code.to_string(), attributes);
    }

    Ok(demographics)
}

/// Convenience wrapper around [`read_demographics`] for in-memory data.
///
/// # Errors
///
/// See [`read_demographics`].
pub fn parse_demographics_csv(csv: &str, code_column: &str) -> Result<Demographics, LoadError> {
    read_demographics(csv_reader(csv.as_bytes()), code_column)
}

/// Merges demographics into `cells`; CSV values override feature
/// properties. Returns how many cells had a demographics row.
pub fn join_demographics(cells: &mut [StatisticalCell], demographics: &Demographics) -> usize {
    let mut joined = 0;
    for cell in cells {
        if let Some(attributes) = demographics.get(&cell.cell_id) {
            cell.attributes
                .extend(attributes.iter().map(|(k, v)| (k.clone(), *v)));
            joined += 1;
        }
    }
    joined
}

fn property_to_code(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_to_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chalandise_geography_models::{CELL_CODE_COLUMN, POPULATION_ATTRIBUTE};

    use super::*;

    const LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "CODE_IRIS": "751010101", "NOM_IRIS": "Saint-Germain", "AREA": 0.5 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[2.34, 48.85], [2.35, 48.85], [2.35, 48.86], [2.34, 48.86], [2.34, 48.85]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CODE_IRIS": 751010102 },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[2.35, 48.85], [2.36, 48.85], [2.36, 48.86], [2.35, 48.86], [2.35, 48.85]]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CODE_IRIS": "751010103" },
                "geometry": { "type": "Point", "coordinates": [2.37, 48.85] }
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons() {
        let cells = parse_cells_geojson(LAYER, CELL_CODE_COLUMN).unwrap();

        assert_eq!(cells.len(), 2, "the point feature is skipped");
        assert_eq!(cells[0].cell_id, "751010101");
        assert_eq!(cells[1].cell_id, "751010102");
        assert_eq!(cells[1].geometry.0.len(), 1);
    }

    #[test]
    fn numeric_properties_become_attributes() {
        let cells = parse_cells_geojson(LAYER, CELL_CODE_COLUMN).unwrap();

        assert_eq!(cells[0].attribute("AREA"), Some(0.5));
        assert_eq!(cells[0].attribute("NOM_IRIS"), None);
        assert!(!cells[0].attributes.contains_key(CELL_CODE_COLUMN));
    }

    #[test]
    fn feature_without_code_is_fatal() {
        let layer = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "OTHER": "x" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[2.34, 48.85], [2.35, 48.85], [2.35, 48.86], [2.34, 48.85]]]
                }
            }]
        }"#;

        assert!(matches!(
            parse_cells_geojson(layer, CELL_CODE_COLUMN),
            Err(LoadError::MissingCellId { feature: 0, .. })
        ));
    }

    #[test]
    fn bare_geometry_is_rejected() {
        let layer = r#"{ "type": "Point", "coordinates": [2.37, 48.85] }"#;
        assert!(matches!(
            parse_cells_geojson(layer, CELL_CODE_COLUMN),
            Err(LoadError::UnsupportedGeometry { .. })
        ));
    }

    #[test]
    fn demographics_skip_blank_and_text_values() {
        let csv = "CODE_IRIS,POP_TOTAL,REVENU_MEDIAN,LIBELLE\n\
                   751010101,1200,,Quartier\n\
                   751010102,800.5,21500,Autre\n";
        let demographics = parse_demographics_csv(csv, CELL_CODE_COLUMN).unwrap();

        let first = &demographics["751010101"];
        assert_eq!(first.get(POPULATION_ATTRIBUTE), Some(&1200.0));
        assert!(!first.contains_key("REVENU_MEDIAN"));
        assert!(!first.contains_key("LIBELLE"));
        assert_eq!(demographics["751010102"].get("REVENU_MEDIAN"), Some(&21_500.0));
    }

    #[test]
    fn demographics_require_the_code_column() {
        let csv = "IRIS,POP_TOTAL\n751010101,1200\n";
        assert!(matches!(
            parse_demographics_csv(csv, CELL_CODE_COLUMN),
            Err(LoadError::MissingColumn { column, .. }) if column == CELL_CODE_COLUMN
        ));
    }

    #[test]
    fn join_is_left_and_csv_wins() {
        let mut cells = parse_cells_geojson(LAYER, CELL_CODE_COLUMN).unwrap();
        let csv = "CODE_IRIS,POP_TOTAL,AREA\n751010101,1200,0.75\n999999999,5,1\n";
        let demographics = parse_demographics_csv(csv, CELL_CODE_COLUMN).unwrap();

        let joined = join_demographics(&mut cells, &demographics);

        assert_eq!(joined, 1);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].population(), Some(1200.0));
        assert_eq!(cells[0].attribute("AREA"), Some(0.75));
        assert_eq!(cells[1].population(), None);
    }
}
