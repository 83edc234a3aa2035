//! In-memory spatial index over the statistical cell layer.
//!
//! Built once per loaded cell set. Holds two R-trees over cell bounding
//! boxes: one in Web Mercator meters for radius (buffer) queries and one in
//! WGS84 degrees for point-in-polygon lookups, plus a table of cell
//! centroids for exact great-circle filtering.

use std::collections::BTreeMap;

use chalandise_geography_models::{LatLon, StatisticalCell};
use geo::{BoundingRect as _, Centroid as _, Contains as _, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::SpatialError;
use crate::projection::{WebMercator, planar_buffer_m};

/// A cell's bounding box stored in an R-tree, pointing back at the cell.
struct CellEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for CellEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over an immutable set of statistical cells.
///
/// Constructed once and shared read-only by the point assigner and the
/// zone resolver. Rebuilding it is the only way to reload the cell set.
pub struct CellIndex {
    cells: Vec<StatisticalCell>,
    positions: BTreeMap<String, usize>,
    centroids: Vec<LatLon>,
    planar_envelopes: Vec<AABB<[f64; 2]>>,
    planar: RTree<CellEntry>,
    geographic: RTree<CellEntry>,
}

impl CellIndex {
    /// Projects every cell, computes centroids and bulk-loads both trees.
    ///
    /// # Errors
    ///
    /// * [`SpatialError::EmptyCellSet`] if `cells` is empty
    /// * [`SpatialError::DuplicateCellId`] if two cells share a code
    /// * [`SpatialError::DegenerateGeometry`] if a cell has no centroid or
    ///   bounding box
    /// * [`SpatialError::Projection`] if a cell cannot be projected
    pub fn build(cells: Vec<StatisticalCell>) -> Result<Self, SpatialError> {
        if cells.is_empty() {
            return Err(SpatialError::EmptyCellSet);
        }

        let mercator = WebMercator::new()?;

        let mut positions = BTreeMap::new();
        let mut centroids = Vec::with_capacity(cells.len());
        let mut planar_envelopes = Vec::with_capacity(cells.len());
        let mut planar_entries = Vec::with_capacity(cells.len());
        let mut geographic_entries = Vec::with_capacity(cells.len());

        for (position, cell) in cells.iter().enumerate() {
            if positions.insert(cell.cell_id.clone(), position).is_some() {
                return Err(SpatialError::DuplicateCellId {
                    cell_id: cell.cell_id.clone(),
                });
            }

            let degenerate = || SpatialError::DegenerateGeometry {
                cell_id: cell.cell_id.clone(),
            };

            let centroid = cell.geometry.centroid().ok_or_else(degenerate)?;
            centroids.push(LatLon::new(centroid.y(), centroid.x()));

            let geographic = compute_envelope(&cell.geometry).ok_or_else(degenerate)?;
            geographic_entries.push(CellEntry {
                position,
                envelope: geographic,
            });

            let projected = mercator.project_geometry(&cell.geometry)?;
            let planar = compute_envelope(&projected).ok_or_else(degenerate)?;
            planar_envelopes.push(planar);
            planar_entries.push(CellEntry {
                position,
                envelope: planar,
            });
        }

        log::info!("Indexed {} statistical cells", cells.len());

        Ok(Self {
            cells,
            positions,
            centroids,
            planar_envelopes,
            planar: RTree::bulk_load(planar_entries),
            geographic: RTree::bulk_load(geographic_entries),
        })
    }

    /// Number of indexed cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: an index cannot be built from an empty cell set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All indexed cells, in load order.
    #[must_use]
    pub fn cells(&self) -> &[StatisticalCell] {
        &self.cells
    }

    /// Looks up a cell by code.
    #[must_use]
    pub fn cell(&self, cell_id: &str) -> Option<&StatisticalCell> {
        self.positions.get(cell_id).map(|&p| &self.cells[p])
    }

    /// Centroid (WGS84) of a cell.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CellNotFound`] if the cell is not indexed.
    pub fn centroid(&self, cell_id: &str) -> Result<LatLon, SpatialError> {
        self.position(cell_id).map(|p| self.centroids[p])
    }

    /// Cells whose planar bounding box intersects a `radius_km` buffer
    /// around the center cell's planar bounding box.
    ///
    /// This is a superset of the cells whose centroid lies within
    /// `radius_km` of the center centroid; callers filter exactly.
    /// Results are sorted by cell code.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CellNotFound`] if the center cell is not
    /// indexed.
    pub fn candidates_within(
        &self,
        center_cell_id: &str,
        radius_km: f64,
    ) -> Result<Vec<&str>, SpatialError> {
        let center = self.position(center_cell_id)?;
        let buffer_m = planar_buffer_m(self.centroids[center].lat, radius_km.max(0.0));

        let envelope = &self.planar_envelopes[center];
        let lower = envelope.lower();
        let upper = envelope.upper();
        let query = AABB::from_corners(
            [lower[0] - buffer_m, lower[1] - buffer_m],
            [upper[0] + buffer_m, upper[1] + buffer_m],
        );

        let mut ids: Vec<&str> = self
            .planar
            .locate_in_envelope_intersecting(&query)
            .map(|entry| self.cells[entry.position].cell_id.as_str())
            .collect();
        ids.sort_unstable();

        Ok(ids)
    }

    /// Code of the cell whose polygon contains the WGS84 point, if any.
    ///
    /// Points exactly on a cell boundary are not contained. Cells are
    /// expected not to overlap; if they do, the first loaded cell wins.
    #[must_use]
    pub fn locate(&self, lon: f64, lat: f64) -> Option<&str> {
        let point = geo::Point::new(lon, lat);
        let query = AABB::from_point([lon, lat]);

        self.geographic
            .locate_in_envelope_intersecting(&query)
            .filter(|entry| self.cells[entry.position].geometry.contains(&point))
            .map(|entry| entry.position)
            .min()
            .map(|p| self.cells[p].cell_id.as_str())
    }

    fn position(&self, cell_id: &str) -> Result<usize, SpatialError> {
        self.positions
            .get(cell_id)
            .copied()
            .ok_or_else(|| SpatialError::CellNotFound {
                cell_id: cell_id.to_string(),
            })
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    /// Square cell of `half` degrees half-width centered on (lon, lat).
    fn square(id: &str, lon: f64, lat: f64, half: f64) -> StatisticalCell {
        let p = polygon![
            (x: lon - half, y: lat - half),
            (x: lon + half, y: lat - half),
            (x: lon + half, y: lat + half),
            (x: lon - half, y: lat + half),
        ];
        StatisticalCell::new(id, MultiPolygon(vec![p]))
    }

    fn grid() -> CellIndex {
        CellIndex::build(vec![
            square("C", 2.35, 48.85, 0.005),
            square("E", 2.3705, 48.85, 0.005),
            square("FAR", 2.60, 48.85, 0.005),
        ])
        .unwrap()
    }

    #[test]
    fn empty_set_is_rejected() {
        assert!(matches!(
            CellIndex::build(Vec::new()),
            Err(SpatialError::EmptyCellSet)
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = CellIndex::build(vec![
            square("A", 2.0, 48.0, 0.01),
            square("A", 3.0, 48.0, 0.01),
        ]);
        assert!(matches!(
            result,
            Err(SpatialError::DuplicateCellId { cell_id }) if cell_id == "A"
        ));
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        let empty = StatisticalCell::new("EMPTY", MultiPolygon(vec![]));
        assert!(matches!(
            CellIndex::build(vec![empty]),
            Err(SpatialError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn centroid_lookup() {
        let index = grid();
        let c = index.centroid("C").unwrap();
        assert!((c.lat - 48.85).abs() < 1e-9);
        assert!((c.lon - 2.35).abs() < 1e-9);
        assert!(matches!(
            index.centroid("MISSING"),
            Err(SpatialError::CellNotFound { .. })
        ));
    }

    #[test]
    fn candidates_include_center_and_neighbors() {
        let index = grid();
        let ids = index.candidates_within("C", 2.0).unwrap();
        assert_eq!(ids, vec!["C", "E"]);
    }

    #[test]
    fn candidates_with_zero_radius_still_include_center() {
        let index = grid();
        let ids = index.candidates_within("C", 0.0).unwrap();
        assert!(ids.contains(&"C"));
        assert!(!ids.contains(&"FAR"));
    }

    #[test]
    fn candidates_for_unknown_center() {
        let index = grid();
        assert!(matches!(
            index.candidates_within("MISSING", 1.0),
            Err(SpatialError::CellNotFound { .. })
        ));
    }

    #[test]
    fn locate_point_in_polygon() {
        let index = grid();
        assert_eq!(index.locate(2.351, 48.851), Some("C"));
        assert_eq!(index.locate(2.371, 48.849), Some("E"));
        assert_eq!(index.locate(0.0, 0.0), None);
    }
}
