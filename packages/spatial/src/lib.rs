#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for catchment-zone computation.
//!
//! Builds R-tree indexes over the statistical cell layer once per loaded
//! dataset, and provides fast radius candidate queries, point-in-polygon
//! assignment of service points, and great-circle distances.

pub mod assign;
pub mod distance;
pub mod index;
pub mod projection;

pub use assign::{Assignment, PointAssigner};
pub use distance::{distance_between_km, great_circle_distance_km};
pub use index::CellIndex;

use thiserror::Error;

/// Errors that can occur while building or querying the spatial index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialError {
    /// The referenced cell is not in the index.
    #[error("Cell not found: {cell_id}")]
    CellNotFound {
        /// The missing cell code.
        cell_id: String,
    },

    /// No cells were supplied to build the index from.
    #[error("Cannot build a spatial index from an empty cell set")]
    EmptyCellSet,

    /// Two cells share the same code.
    #[error("Duplicate cell id: {cell_id}")]
    DuplicateCellId {
        /// The duplicated cell code.
        cell_id: String,
    },

    /// A cell geometry has no area to take a centroid or bounding box of.
    #[error("Degenerate geometry for cell {cell_id}")]
    DegenerateGeometry {
        /// The offending cell code.
        cell_id: String,
    },

    /// Coordinate transformation failed.
    #[error("Projection error: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },

    /// A point could not be tested against the cell polygons.
    #[error("Spatial join failed for point {point_id}: {message}")]
    SpatialJoinFailure {
        /// Identifier of the offending point.
        point_id: String,
        /// Description of what went wrong.
        message: String,
    },
}
