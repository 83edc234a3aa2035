//! CSV and `GeoJSON` export of pipeline results.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chalandise_spatial::CellIndex;
use chalandise_zones_models::{CellCoverageRow, FlatStats, PipelineResult, PointZoneRow};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::CliError;

pub const POINTS_FILE: &str = "zones_by_point.csv";
pub const CELLS_FILE: &str = "covered_cells.csv";
pub const GLOBAL_STATS_FILE: &str = "global_stats.csv";
pub const ORPHANS_FILE: &str = "orphan_points.csv";
pub const FAILURES_FILE: &str = "failed_groups.csv";
pub const CELLS_GEOJSON_FILE: &str = "covered_cells.geojson";

/// Writes every output file into `output_dir`, creating it if needed.
/// Returns the paths written.
///
/// # Errors
///
/// Returns [`CliError`] if a file cannot be created or serialized.
pub fn write_all(
    output_dir: &Path,
    result: &PipelineResult,
    index: &CellIndex,
) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(output_dir).map_err(|e| CliError::Io {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    let path = |name: &str| output_dir.join(name);

    let points = path(POINTS_FILE);
    write_points_csv(create_file(&points)?, &result.points)?;

    let cells = path(CELLS_FILE);
    write_cells_csv(create_file(&cells)?, &result.cells)?;

    let global_stats = path(GLOBAL_STATS_FILE);
    write_flat_csv(create_file(&global_stats)?, &result.global_stats.flatten())?;

    let orphans = path(ORPHANS_FILE);
    write_orphans_csv(create_file(&orphans)?, result)?;

    let failures = path(FAILURES_FILE);
    write_failures_csv(create_file(&failures)?, result)?;

    let geojson = path(CELLS_GEOJSON_FILE);
    serde_json::to_writer(
        create_file(&geojson)?,
        &covered_cells_geojson(&result.cells, index),
    )?;

    let written = vec![points, cells, global_stats, orphans, failures, geojson];
    for file in &written {
        log::info!("Wrote {}", file.display());
    }

    Ok(written)
}

fn create_file(path: &Path) -> Result<std::fs::File, CliError> {
    std::fs::File::create(path).map_err(|e| CliError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Per-point view: identity columns, then every zone statistic in
/// first-seen order. Statistics a zone lacks are left empty.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if writing fails.
pub fn write_points_csv<W: Write>(writer: W, rows: &[PointZoneRow]) -> Result<(), CliError> {
    let stat_names = union_in_order(rows.iter().map(|row| &row.zone_stats));

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec![
        "point_id",
        "point_name",
        "address",
        "locality",
        "latitude",
        "longitude",
        "environment_class",
        "center_cell_id",
    ];
    header.extend(stat_names.iter().map(String::as_str));
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.point_id.clone(),
            row.point_name.clone(),
            row.address.clone().unwrap_or_default(),
            row.locality.clone().unwrap_or_default(),
            row.latitude.to_string(),
            row.longitude.to_string(),
            row.environment_class.clone(),
            row.center_cell_id.clone(),
        ];
        record.extend(stat_names.iter().map(|name| {
            row.zone_stats
                .get(name)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        csv.write_record(&record)?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Per-cell view: coverage counts (one `coverage_<class>` column per class,
/// 0 where the class never covers the cell), dominant class, then the
/// cell's attributes.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if writing fails.
pub fn write_cells_csv<W: Write>(writer: W, rows: &[CellCoverageRow]) -> Result<(), CliError> {
    let classes: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.coverage_count_by_class.keys().map(String::as_str))
        .collect();
    let attributes: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.attributes.keys().map(String::as_str))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["cell_id".to_string(), "coverage_total".to_string()];
    header.extend(classes.iter().map(|class| format!("coverage_{class}")));
    header.push("dominant_environment_class".to_string());
    header.extend(attributes.iter().map(ToString::to_string));
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.cell_id.clone(), row.coverage_count_total.to_string()];
        record.extend(classes.iter().map(|class| {
            row.coverage_count_by_class
                .get(*class)
                .copied()
                .unwrap_or(0)
                .to_string()
        }));
        record.push(row.dominant_environment_class.clone());
        record.extend(attributes.iter().map(|name| {
            row.attributes
                .get(*name)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        csv.write_record(&record)?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Single-row table of flattened statistics.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if writing fails.
pub fn write_flat_csv<W: Write>(writer: W, stats: &FlatStats) -> Result<(), CliError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(stats.names())?;
    csv.write_record(stats.iter().map(|(_, value)| value.to_string()))?;
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Points no cell contains, with the reason.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if writing fails.
pub fn write_orphans_csv<W: Write>(writer: W, result: &PipelineResult) -> Result<(), CliError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "point_id",
        "point_name",
        "address",
        "locality",
        "latitude",
        "longitude",
        "reason",
    ])?;

    for orphan in &result.orphans {
        let point = &orphan.point;
        csv.write_record([
            point.id.clone(),
            point.name.clone(),
            point.address.clone().unwrap_or_default(),
            point.locality.clone().unwrap_or_default(),
            point.location.lat.to_string(),
            point.location.lon.to_string(),
            orphan.reason.to_string(),
        ])?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Groups whose zone could not be resolved.
///
/// # Errors
///
/// Returns [`CliError::Csv`] if writing fails.
pub fn write_failures_csv<W: Write>(writer: W, result: &PipelineResult) -> Result<(), CliError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "center_cell_id",
        "environment_class",
        "kind",
        "point_count",
        "point_ids",
        "message",
    ])?;

    for failure in &result.failures {
        csv.write_record([
            failure.center_cell_id.clone(),
            failure.environment_class.clone(),
            failure.kind.to_string(),
            failure.point_ids.len().to_string(),
            failure.point_ids.join(";"),
            failure.message.clone(),
        ])?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Covered cells as a `FeatureCollection` for web maps.
#[must_use]
pub fn covered_cells_geojson(rows: &[CellCoverageRow], index: &CellIndex) -> FeatureCollection {
    let features = rows
        .iter()
        .filter_map(|row| {
            let cell = index.cell(&row.cell_id)?;

            let mut properties = JsonObject::new();
            properties.insert("cell_id".to_string(), JsonValue::from(row.cell_id.clone()));
            properties.insert(
                "coverage_total".to_string(),
                JsonValue::from(row.coverage_count_total),
            );
            properties.insert(
                "dominant_environment_class".to_string(),
                JsonValue::from(row.dominant_environment_class.clone()),
            );

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&cell.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Union of the stat names of `stats`, in first-seen order.
fn union_in_order<'a>(stats: impl Iterator<Item = &'a FlatStats>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut names = Vec::new();
    for flat in stats {
        for name in flat.names() {
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chalandise_geography_models::{
        LatLon, OrphanPoint, OrphanReason, POPULATION_ATTRIBUTE, ServicePoint, StatisticalCell,
    };
    use chalandise_zones_models::{FailureKind, GroupFailure, StatValue};
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn to_string(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn point_row(id: &str, stats: &[(&str, StatValue)]) -> PointZoneRow {
        let mut zone_stats = FlatStats::default();
        for (name, value) in stats {
            zone_stats.push(*name, *value);
        }
        PointZoneRow {
            point_id: id.to_string(),
            point_name: format!("Point {id}"),
            address: None,
            locality: Some("Paris".to_string()),
            latitude: 48.85,
            longitude: 2.35,
            environment_class: "Urban".to_string(),
            center_cell_id: "C".to_string(),
            zone_stats,
        }
    }

    fn coverage_row(id: &str, counts: &[(&str, usize)]) -> CellCoverageRow {
        CellCoverageRow {
            cell_id: id.to_string(),
            attributes: BTreeMap::from([(POPULATION_ATTRIBUTE.to_string(), 1200.0)]),
            coverage_count_total: counts.iter().map(|(_, n)| n).sum(),
            coverage_count_by_class: counts
                .iter()
                .map(|(class, n)| ((*class).to_string(), *n))
                .collect(),
            dominant_environment_class: counts[0].0.to_string(),
        }
    }

    #[test]
    fn points_csv_unions_stat_columns() {
        let rows = [
            point_row("P1", &[("population_total", StatValue::Integer(10))]),
            point_row(
                "P2",
                &[
                    ("population_total", StatValue::Integer(20)),
                    ("weighted_median_income", StatValue::Missing),
                    ("theoretical_radius_km", StatValue::Number(2.0)),
                ],
            ),
        ];

        let mut buf = Vec::new();
        write_points_csv(&mut buf, &rows).unwrap();
        let lines: Vec<String> = to_string(buf).lines().map(str::to_string).collect();

        assert_eq!(
            lines[0],
            "point_id,point_name,address,locality,latitude,longitude,environment_class,\
             center_cell_id,population_total,weighted_median_income,theoretical_radius_km"
        );
        assert_eq!(lines[1], "P1,Point P1,,Paris,48.85,2.35,Urban,C,10,,");
        assert_eq!(lines[2], "P2,Point P2,,Paris,48.85,2.35,Urban,C,20,,2");
    }

    #[test]
    fn cells_csv_fills_missing_classes_with_zero() {
        let rows = [
            coverage_row("A", &[("urban", 2)]),
            coverage_row("B", &[("rural", 1), ("urban", 1)]),
        ];

        let mut buf = Vec::new();
        write_cells_csv(&mut buf, &rows).unwrap();
        let text = to_string(buf);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "cell_id,coverage_total,coverage_rural,coverage_urban,dominant_environment_class,POP_TOTAL"
        );
        assert_eq!(lines[1], "A,2,0,2,urban,1200");
        assert_eq!(lines[2], "B,2,1,1,rural,1200");
    }

    #[test]
    fn flat_csv_is_a_single_row() {
        let mut stats = FlatStats::default();
        stats.push("population_total", StatValue::Integer(4000));
        stats.push("weighted_median_income", StatValue::Number(27_500.0));

        let mut buf = Vec::new();
        write_flat_csv(&mut buf, &stats).unwrap();

        assert_eq!(
            to_string(buf),
            "population_total,weighted_median_income\n4000,27500\n"
        );
    }

    #[test]
    fn orphans_and_failures_are_listed() {
        let result = PipelineResult {
            orphans: vec![OrphanPoint {
                point: ServicePoint {
                    id: "X1".to_string(),
                    name: "Offshore".to_string(),
                    location: LatLon::new(45.0, -5.0),
                    environment_class: "urban".to_string(),
                    address: None,
                    locality: None,
                },
                reason: OrphanReason::OutsideCoverage,
            }],
            failures: vec![GroupFailure {
                center_cell_id: "C".to_string(),
                environment_class: "suburban".to_string(),
                point_ids: vec!["P2".to_string(), "P3".to_string()],
                kind: FailureKind::InvalidConfig,
                message: "not configured".to_string(),
            }],
            ..PipelineResult::default()
        };

        let mut orphans = Vec::new();
        write_orphans_csv(&mut orphans, &result).unwrap();
        let orphans = to_string(orphans);
        assert!(orphans.lines().nth(1).unwrap().starts_with("X1,Offshore,,,45,-5,"));

        let mut failures = Vec::new();
        write_failures_csv(&mut failures, &result).unwrap();
        assert_eq!(
            to_string(failures).lines().nth(1),
            Some("C,suburban,INVALID_CONFIG,2,P2;P3,not configured")
        );
    }

    #[test]
    fn geojson_carries_coverage_properties() {
        let p = polygon![
            (x: 2.345, y: 48.845),
            (x: 2.355, y: 48.845),
            (x: 2.355, y: 48.855),
            (x: 2.345, y: 48.855),
        ];
        let index = CellIndex::build(vec![StatisticalCell::new("A", MultiPolygon(vec![p]))])
            .unwrap();
        let rows = [coverage_row("A", &[("urban", 2)]), coverage_row("GONE", &[("urban", 1)])];

        let collection = covered_cells_geojson(&rows, &index);

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert!(feature.geometry.is_some());
        assert_eq!(feature.property("cell_id"), Some(&JsonValue::from("A")));
        assert_eq!(feature.property("coverage_total"), Some(&JsonValue::from(2)));
        assert_eq!(
            feature.property("dominant_environment_class"),
            Some(&JsonValue::from("urban"))
        );
    }
}
