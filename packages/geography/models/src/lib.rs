#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical cell and service point types.
//!
//! Statistical cells (IRIS) are the small polygons socio-demographic data
//! is reported on. Service points (relay points, agencies) are the
//! locations whose catchment zones are built out of those cells.

pub mod attributes;

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

pub use attributes::{
    AgeBracket, AttributeCategory, CELL_CODE_COLUMN, INCOME_ATTRIBUTE, Occupation,
    POPULATION_ATTRIBUTE, Sex,
};

/// A geographic coordinate in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    /// Creates a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and within WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A statistical cell with its WGS84 geometry and demographic attributes.
///
/// Cells are immutable once loaded; the whole set is shared read-only by
/// every zone computation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalCell {
    /// Unique cell code (e.g. `"751010101"`).
    pub cell_id: String,
    /// Cell boundary in WGS84 longitude/latitude.
    pub geometry: MultiPolygon<f64>,
    /// Demographic attribute name -> value (e.g. `POP_TOTAL`).
    pub attributes: BTreeMap<String, f64>,
}

impl StatisticalCell {
    /// Creates a cell with no demographic attributes.
    #[must_use]
    pub fn new(cell_id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            cell_id: cell_id.into(),
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the cell with `key` set to `value`.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns the attribute value, or `None` if it is absent or not a
    /// finite number.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).copied().filter(|v| v.is_finite())
    }

    /// Total population, if reported.
    #[must_use]
    pub fn population(&self) -> Option<f64> {
        self.attribute(POPULATION_ATTRIBUTE)
    }

    /// Median income, if reported.
    #[must_use]
    pub fn median_income(&self) -> Option<f64> {
        self.attribute(INCOME_ATTRIBUTE)
    }
}

/// A geolocated service point (relay point, agency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePoint {
    /// Point identifier (agency code).
    pub id: String,
    /// Display name.
    pub name: String,
    /// WGS84 location.
    pub location: LatLon,
    /// Raw environment class label (e.g. "Com > 200 m habts").
    pub environment_class: String,
    /// Street address.
    pub address: Option<String>,
    /// Municipality.
    pub locality: Option<String>,
}

/// A service point matched to the statistical cell containing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPoint {
    /// The input point.
    pub point: ServicePoint,
    /// Code of the cell whose polygon contains the point.
    pub assigned_cell_id: String,
}

/// Why a service point could not be matched to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrphanReason {
    /// No cell polygon contains the point (offshore, out of coverage, or
    /// lying exactly on a boundary).
    OutsideCoverage,
    /// The point's coordinates could not be tested at all.
    SpatialJoinFailure {
        /// Description of the malformed input.
        message: String,
    },
}

impl std::fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutsideCoverage => write!(f, "outside coverage"),
            Self::SpatialJoinFailure { message } => write!(f, "spatial join failure: {message}"),
        }
    }
}

/// A service point that was not matched to any cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanPoint {
    /// The input point.
    pub point: ServicePoint,
    /// Why it was not matched.
    pub reason: OrphanReason,
}
