//! Point-in-polygon assignment of service points to statistical cells.

use chalandise_geography_models::{AssignedPoint, OrphanPoint, OrphanReason, ServicePoint};

use crate::SpatialError;
use crate::index::CellIndex;

/// Outcome of assigning a batch of points.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    /// Points matched to the cell containing them, in input order.
    pub assigned: Vec<AssignedPoint>,
    /// Points no cell contains, in input order.
    pub orphans: Vec<OrphanPoint>,
}

/// Spatial join of service points against the indexed cell polygons.
///
/// Both points and cells are in WGS84 longitude/latitude, so no
/// reprojection is needed before the containment test.
pub struct PointAssigner<'a> {
    index: &'a CellIndex,
}

impl<'a> PointAssigner<'a> {
    /// Creates an assigner over an already-built index.
    #[must_use]
    pub const fn new(index: &'a CellIndex) -> Self {
        Self { index }
    }

    /// Finds the cell containing a single point.
    ///
    /// Returns `Ok(None)` when no cell contains the point.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::SpatialJoinFailure`] if the point's
    /// coordinates are non-finite or outside WGS84 bounds.
    pub fn locate(&self, point: &ServicePoint) -> Result<Option<&'a str>, SpatialError> {
        if !point.location.is_valid() {
            return Err(SpatialError::SpatialJoinFailure {
                point_id: point.id.clone(),
                message: format!(
                    "invalid coordinates (lat {}, lon {})",
                    point.location.lat, point.location.lon
                ),
            });
        }

        Ok(self.index.locate(point.location.lon, point.location.lat))
    }

    /// Splits `points` into matched points and orphans.
    ///
    /// A point whose coordinates cannot be tested becomes an orphan rather
    /// than failing the batch.
    #[must_use]
    pub fn assign(&self, points: &[ServicePoint]) -> Assignment {
        let mut assignment = Assignment::default();

        for point in points {
            match self.locate(point) {
                Ok(Some(cell_id)) => assignment.assigned.push(AssignedPoint {
                    point: point.clone(),
                    assigned_cell_id: cell_id.to_string(),
                }),
                Ok(None) => assignment.orphans.push(OrphanPoint {
                    point: point.clone(),
                    reason: OrphanReason::OutsideCoverage,
                }),
                Err(e) => {
                    log::debug!("{e}");
                    assignment.orphans.push(OrphanPoint {
                        point: point.clone(),
                        reason: OrphanReason::SpatialJoinFailure {
                            message: e.to_string(),
                        },
                    });
                }
            }
        }

        if !assignment.orphans.is_empty() {
            log::warn!(
                "{} of {} points have no statistical cell (outside the polygons)",
                assignment.orphans.len(),
                points.len()
            );
        }

        assignment
    }
}
