#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catchment zone types.
//!
//! A catchment zone is the set of statistical cells served by the service
//! points of one (center cell, environment class) group. These types carry
//! the resolved zones, their demographic summaries and the per-point /
//! per-cell views assembled by the zone pipeline.

pub mod environment;
pub mod stats;

use std::collections::BTreeMap;

use chalandise_geography_models::{OrphanPoint, ServicePoint};
use serde::{Deserialize, Serialize};

pub use environment::{
    EnvironmentLookupError, EnvironmentParameters, EnvironmentSettings,
    normalize_environment_class,
};
pub use stats::{FlatStats, StatValue, StatsSummary};

/// Slack applied to the catchment radius when testing centroid distances.
///
/// Compensates for centroid-vs-boundary discretization: a cell whose
/// centroid sits just beyond the nominal radius is still included.
pub const RADIUS_SLACK: f64 = 1.05;

/// The resolved catchment zone of one (center cell, environment class)
/// pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentZone {
    /// Cell containing the service points the zone is built for.
    pub center_cell_id: String,
    /// Normalized environment class.
    pub environment_class: String,
    /// Configured radius for the class, in kilometers.
    pub theoretical_radius_km: f64,
    /// Member cell codes, sorted. Always includes the center cell.
    pub member_cell_ids: Vec<String>,
    /// Largest center-to-member centroid distance, in kilometers.
    pub max_observed_radius_km: f64,
    /// Mean center-to-member centroid distance, in kilometers.
    pub mean_observed_radius_km: f64,
    /// Demographic summary over the member cells.
    pub stats: StatsSummary,
}

impl CatchmentZone {
    /// Whether `cell_id` belongs to the zone.
    #[must_use]
    pub fn contains(&self, cell_id: &str) -> bool {
        self.member_cell_ids
            .binary_search_by(|id| id.as_str().cmp(cell_id))
            .is_ok()
    }

    /// Flattened demographic summary followed by the radius statistics.
    #[must_use]
    pub fn flatten(&self) -> FlatStats {
        let mut flat = self.stats.flatten();
        flat.push(
            "max_observed_radius_km",
            StatValue::Number(self.max_observed_radius_km),
        );
        flat.push(
            "mean_observed_radius_km",
            StatValue::Number(self.mean_observed_radius_km),
        );
        flat.push(
            "theoretical_radius_km",
            StatValue::Number(self.theoretical_radius_km),
        );
        flat
    }
}

/// One service point with the statistics of its catchment zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointZoneRow {
    /// Point identifier.
    pub point_id: String,
    /// Point display name.
    pub point_name: String,
    /// Street address.
    pub address: Option<String>,
    /// Municipality.
    pub locality: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Environment class as given in the input.
    pub environment_class: String,
    /// Cell containing the point (the zone's center).
    pub center_cell_id: String,
    /// Flattened zone statistics.
    pub zone_stats: FlatStats,
}

impl PointZoneRow {
    /// Builds the row for `point` in `zone`.
    #[must_use]
    pub fn new(point: &ServicePoint, zone: &CatchmentZone) -> Self {
        Self {
            point_id: point.id.clone(),
            point_name: point.name.clone(),
            address: point.address.clone(),
            locality: point.locality.clone(),
            latitude: point.location.lat,
            longitude: point.location.lon,
            environment_class: point.environment_class.clone(),
            center_cell_id: zone.center_cell_id.clone(),
            zone_stats: zone.flatten(),
        }
    }
}

/// One statistical cell covered by at least one catchment zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellCoverageRow {
    /// Cell code.
    pub cell_id: String,
    /// The cell's own demographic attributes.
    pub attributes: BTreeMap<String, f64>,
    /// Number of distinct center cells whose zone includes this cell.
    pub coverage_count_total: usize,
    /// Number of distinct center cells per normalized environment class.
    pub coverage_count_by_class: BTreeMap<String, usize>,
    /// Class with the highest coverage count. Ties go to the
    /// lexicographically smallest class.
    pub dominant_environment_class: String,
}

/// Why a (center cell, environment class) group produced no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The center cell is not in the loaded cell set.
    NotFound,
    /// The environment class has no usable radius.
    InvalidConfig,
    /// The spatial index rejected the query.
    Spatial,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidConfig => write!(f, "INVALID_CONFIG"),
            Self::Spatial => write!(f, "SPATIAL"),
        }
    }
}

/// A group whose zone could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFailure {
    /// Center cell of the group.
    pub center_cell_id: String,
    /// Normalized environment class of the group.
    pub environment_class: String,
    /// Points that received no zone.
    pub point_ids: Vec<String>,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
}

/// Everything a zone pipeline run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// One row per point whose group resolved.
    pub points: Vec<PointZoneRow>,
    /// One row per covered cell, sorted by cell code.
    pub cells: Vec<CellCoverageRow>,
    /// Summary over every covered cell.
    pub global_stats: StatsSummary,
    /// Points not matched to any cell.
    pub orphans: Vec<OrphanPoint>,
    /// Groups that failed to resolve.
    pub failures: Vec<GroupFailure>,
}
