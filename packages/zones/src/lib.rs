#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Catchment zone engine.
//!
//! Service points are assigned to the statistical cell containing them,
//! grouped by (center cell, environment class), and each group gets a
//! radius-based catchment zone with demographic statistics. The pipeline
//! then rolls zones up into per-point rows, per-cell coverage counts and
//! global statistics over every covered cell.

pub mod pipeline;
pub mod progress;
pub mod resolver;
pub mod stats;

pub use pipeline::{ZonePipeline, dominant_class};
pub use progress::{LogProgress, NullProgress, ProgressCallback, null_progress};
pub use resolver::ZoneResolver;
pub use stats::aggregate;

use chalandise_spatial::SpatialError;
use chalandise_zones_models::{EnvironmentLookupError, FailureKind};
use thiserror::Error;

/// Errors that can occur while resolving a catchment zone.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The center cell is not in the loaded cell set.
    #[error("Center cell not found: {cell_id}")]
    NotFound {
        /// The missing cell code.
        cell_id: String,
    },

    /// The environment class has no usable radius.
    #[error("Invalid environment configuration: {source}")]
    InvalidConfig {
        /// The underlying lookup failure.
        #[from]
        source: EnvironmentLookupError,
    },

    /// Any other spatial index failure.
    #[error(transparent)]
    Spatial(SpatialError),
}

impl ZoneError {
    /// Failure category recorded for the group.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::InvalidConfig { .. } => FailureKind::InvalidConfig,
            Self::Spatial(_) => FailureKind::Spatial,
        }
    }
}

impl From<SpatialError> for ZoneError {
    fn from(e: SpatialError) -> Self {
        match e {
            SpatialError::CellNotFound { cell_id } => Self::NotFound { cell_id },
            other => Self::Spatial(other),
        }
    }
}
