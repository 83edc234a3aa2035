//! End-to-end catchment zone computation for a batch of service points.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chalandise_geography_models::{AssignedPoint, ServicePoint};
use chalandise_spatial::PointAssigner;
use chalandise_zones_models::{
    CatchmentZone, CellCoverageRow, EnvironmentParameters, GroupFailure, PipelineResult,
    PointZoneRow, normalize_environment_class,
};

use crate::progress::{ProgressCallback, null_progress};
use crate::resolver::ZoneResolver;
use crate::stats::aggregate;

type GroupKey = (String, String);

/// Runs point assignment, zone resolution and the coverage roll-up.
///
/// Borrows the resolver, so several runs share its zone cache.
pub struct ZonePipeline<'a> {
    resolver: &'a ZoneResolver,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a> ZonePipeline<'a> {
    /// Creates a pipeline that reports no progress.
    #[must_use]
    pub fn new(resolver: &'a ZoneResolver) -> Self {
        Self {
            resolver,
            progress: null_progress(),
        }
    }

    /// Reports one unit of progress per resolved group to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Computes every view for `points`.
    ///
    /// Never fails as a whole: orphan points and groups whose zone cannot
    /// be resolved are reported in the result next to the successful rows.
    #[must_use]
    pub fn run(&self, points: &[ServicePoint], params: &EnvironmentParameters) -> PipelineResult {
        let index = self.resolver.index();
        let assignment = PointAssigner::new(index).assign(points);
        log::info!(
            "Assigned {} of {} points to statistical cells",
            assignment.assigned.len(),
            points.len()
        );

        let groups = group_points(&assignment.assigned);
        log::info!("Resolving {} (cell, environment) groups", groups.len());

        self.progress.set_total(groups.len() as u64);
        self.progress.set_message("Resolving catchment zones".to_string());

        let mut zones: BTreeMap<&GroupKey, Arc<CatchmentZone>> = BTreeMap::new();
        let mut failures = Vec::new();

        for (key, members) in &groups {
            let (cell_id, class) = key;
            match self.resolver.resolve_zone(cell_id, class, params) {
                Ok(zone) => {
                    zones.insert(key, zone);
                }
                Err(e) => {
                    log::warn!(
                        "Zone for cell {cell_id} / '{class}' failed ({} points): {e}",
                        members.len()
                    );
                    failures.push(GroupFailure {
                        center_cell_id: cell_id.clone(),
                        environment_class: class.clone(),
                        point_ids: members.iter().map(|p| p.point.id.clone()).collect(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish(format!(
            "Resolved {} zones, {} failed groups",
            zones.len(),
            failures.len()
        ));

        let point_rows = assignment
            .assigned
            .iter()
            .filter_map(|assigned| {
                let zone = zones.get(&group_key(assigned))?;
                Some(PointZoneRow::new(&assigned.point, zone))
            })
            .collect();

        let cells = coverage_rows(self.resolver, zones.values().map(|zone| &**zone));
        let global_stats = aggregate(cells.iter().filter_map(|row| index.cell(&row.cell_id)));

        log::info!(
            "{} cells covered, population {}",
            cells.len(),
            global_stats.population_total
        );

        PipelineResult {
            points: point_rows,
            cells,
            global_stats,
            orphans: assignment.orphans,
            failures,
        }
    }
}

fn group_key(assigned: &AssignedPoint) -> GroupKey {
    (
        assigned.assigned_cell_id.clone(),
        normalize_environment_class(&assigned.point.environment_class),
    )
}

fn group_points(assigned: &[AssignedPoint]) -> BTreeMap<GroupKey, Vec<&AssignedPoint>> {
    let mut groups: BTreeMap<GroupKey, Vec<&AssignedPoint>> = BTreeMap::new();
    for point in assigned {
        groups.entry(group_key(point)).or_default().push(point);
    }
    groups
}

fn coverage_rows<'z>(
    resolver: &ZoneResolver,
    zones: impl Iterator<Item = &'z CatchmentZone>,
) -> Vec<CellCoverageRow> {
    // cell -> (all centers, class -> centers)
    let mut coverage: BTreeMap<&str, (BTreeSet<&str>, BTreeMap<&str, BTreeSet<&str>>)> =
        BTreeMap::new();

    for zone in zones {
        for member in &zone.member_cell_ids {
            let (centers, by_class) = coverage.entry(member.as_str()).or_default();
            centers.insert(zone.center_cell_id.as_str());
            by_class
                .entry(zone.environment_class.as_str())
                .or_default()
                .insert(zone.center_cell_id.as_str());
        }
    }

    coverage
        .into_iter()
        .map(|(cell_id, (centers, by_class))| {
            let coverage_count_by_class: BTreeMap<String, usize> = by_class
                .into_iter()
                .map(|(class, centers)| (class.to_string(), centers.len()))
                .collect();
            let dominant_environment_class = dominant_class(&coverage_count_by_class)
                .unwrap_or_default()
                .to_string();

            CellCoverageRow {
                cell_id: cell_id.to_string(),
                attributes: resolver
                    .index()
                    .cell(cell_id)
                    .map(|cell| cell.attributes.clone())
                    .unwrap_or_default(),
                coverage_count_total: centers.len(),
                coverage_count_by_class,
                dominant_environment_class,
            }
        })
        .collect()
}

/// Class with the highest count. Ties go to the lexicographically
/// smallest class; `None` for an empty map.
#[must_use]
pub fn dominant_class(counts: &BTreeMap<String, usize>) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for (class, &count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((class.as_str(), count));
        }
    }
    best.map(|(class, _)| class)
}

#[cfg(test)]
mod tests {
    use chalandise_geography_models::{
        INCOME_ATTRIBUTE, LatLon, OrphanReason, POPULATION_ATTRIBUTE, StatisticalCell,
    };
    use chalandise_spatial::CellIndex;
    use chalandise_zones_models::{FailureKind, StatValue};
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn square(id: &str, lon: f64, lat: f64) -> StatisticalCell {
        let half = 0.005;
        let p = polygon![
            (x: lon - half, y: lat - half),
            (x: lon + half, y: lat - half),
            (x: lon + half, y: lat + half),
            (x: lon - half, y: lat + half),
        ];
        StatisticalCell::new(id, MultiPolygon(vec![p]))
    }

    fn point(id: &str, lat: f64, lon: f64, class: &str) -> ServicePoint {
        ServicePoint {
            id: id.to_string(),
            name: format!("Point {id}"),
            location: LatLon::new(lat, lon),
            environment_class: class.to_string(),
            address: None,
            locality: None,
        }
    }

    /// C and its neighbor N about 1.5 km east.
    fn resolver() -> ZoneResolver {
        let index = CellIndex::build(vec![
            square("C", 2.35, 48.85)
                .with_attribute(POPULATION_ATTRIBUTE, 1000.0)
                .with_attribute(INCOME_ATTRIBUTE, 20_000.0),
            square("N", 2.3705, 48.85)
                .with_attribute(POPULATION_ATTRIBUTE, 3000.0)
                .with_attribute(INCOME_ATTRIBUTE, 30_000.0),
        ])
        .unwrap();
        ZoneResolver::new(Arc::new(index))
    }

    fn params() -> EnvironmentParameters {
        EnvironmentParameters::from_radii([("urban", 2.0), ("rural", 9.0)])
    }

    #[test]
    fn three_points_in_one_cell_share_a_zone() {
        let resolver = resolver();
        let points = [
            point("P1", 48.851, 2.349, "urban"),
            point("P2", 48.849, 2.351, "Urban"),
            point("P3", 48.850, 2.350, " URBAN"),
        ];

        let result = ZonePipeline::new(&resolver).run(&points, &params());

        assert!(result.failures.is_empty());
        assert!(result.orphans.is_empty());
        assert_eq!(resolver.index_scan_count(), 1);

        assert_eq!(result.points.len(), 3);
        for row in &result.points {
            assert_eq!(row.center_cell_id, "C");
            assert_eq!(row.zone_stats, result.points[0].zone_stats);
        }
        assert_eq!(result.points[1].environment_class, "Urban");
        assert_eq!(
            result.points[0].zone_stats.get("population_total").and_then(StatValue::as_f64),
            Some(4000.0)
        );

        let ids: Vec<&str> = result.cells.iter().map(|c| c.cell_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "N"]);
        for cell in &result.cells {
            assert_eq!(cell.coverage_count_total, 1);
            assert_eq!(cell.coverage_count_by_class.get("urban"), Some(&1));
            assert_eq!(cell.dominant_environment_class, "urban");
        }
        assert_eq!(
            result.cells[1].attributes.get(POPULATION_ATTRIBUTE),
            Some(&3000.0)
        );

        assert_eq!(result.global_stats.population_total, 4000);
        assert_eq!(result.global_stats.weighted_median_income, Some(27_500.0));
    }

    #[test]
    fn unknown_class_fails_only_its_group() {
        let resolver = resolver();
        let points = [
            point("P1", 48.85, 2.35, "urban"),
            point("P2", 48.85, 2.35, "suburban"),
            point("P3", 48.85, 2.3705, "suburban"),
        ];

        let result = ZonePipeline::new(&resolver).run(&points, &params());

        assert_eq!(result.points.len(), 1);
        assert_eq!(result.points[0].point_id, "P1");

        assert_eq!(result.failures.len(), 2);
        for failure in &result.failures {
            assert_eq!(failure.kind, FailureKind::InvalidConfig);
            assert_eq!(failure.environment_class, "suburban");
        }
        assert_eq!(result.failures[0].center_cell_id, "C");
        assert_eq!(result.failures[0].point_ids, vec!["P2"]);
        assert_eq!(result.failures[1].point_ids, vec!["P3"]);
    }

    #[test]
    fn orphans_are_reported_and_skipped() {
        let resolver = resolver();
        let points = [
            point("IN", 48.85, 2.35, "urban"),
            point("OUT", 45.0, 5.0, "urban"),
            point("NAN", f64::NAN, 2.35, "urban"),
        ];

        let result = ZonePipeline::new(&resolver).run(&points, &params());

        assert_eq!(result.points.len(), 1);
        assert_eq!(result.orphans.len(), 2);
        assert_eq!(result.orphans[0].point.id, "OUT");
        assert_eq!(result.orphans[0].reason, OrphanReason::OutsideCoverage);
        assert!(matches!(
            result.orphans[1].reason,
            OrphanReason::SpatialJoinFailure { .. }
        ));
    }

    #[test]
    fn coverage_counts_distinct_centers_per_class() {
        let resolver = resolver();
        let points = [
            point("P1", 48.85, 2.35, "urban"),
            point("P2", 48.85, 2.3705, "urban"),
            point("P3", 48.85, 2.35, "rural"),
        ];

        let result = ZonePipeline::new(&resolver).run(&points, &params());

        assert_eq!(result.cells.len(), 2);
        let c = &result.cells[0];
        assert_eq!(c.cell_id, "C");
        // Centers C and N, both classes: C appears under two classes but
        // counts once in the total.
        assert_eq!(c.coverage_count_total, 2);
        assert_eq!(c.coverage_count_by_class.get("urban"), Some(&2));
        assert_eq!(c.coverage_count_by_class.get("rural"), Some(&1));
        assert_eq!(c.dominant_environment_class, "urban");
    }

    #[test]
    fn empty_input_yields_empty_views() {
        let resolver = resolver();
        let result = ZonePipeline::new(&resolver).run(&[], &params());

        assert!(result.points.is_empty());
        assert!(result.cells.is_empty());
        assert_eq!(result.global_stats.population_total, 0);
        assert!(result.global_stats.is_empty());
    }

    #[test]
    fn dominant_class_breaks_ties_lexicographically() {
        let counts = BTreeMap::from([
            ("urban".to_string(), 2),
            ("rural".to_string(), 2),
            ("mixed".to_string(), 1),
        ]);
        assert_eq!(dominant_class(&counts), Some("rural"));

        let counts = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 3)]);
        assert_eq!(dominant_class(&counts), Some("b"));

        assert_eq!(dominant_class(&BTreeMap::new()), None);
    }
}
