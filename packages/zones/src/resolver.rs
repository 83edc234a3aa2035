//! Catchment zone resolution with memoization.
//!
//! Many service points share the same center cell and environment class,
//! so resolved zones are cached on (center cell, normalized class, radius).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chalandise_spatial::{CellIndex, distance_between_km};
use chalandise_zones_models::{
    CatchmentZone, EnvironmentParameters, RADIUS_SLACK, normalize_environment_class,
};

use crate::ZoneError;
use crate::stats::{aggregate, round_to};

/// Cache key: any change to one component forces a recomputation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ZoneKey {
    center_cell_id: String,
    environment_class: String,
    radius_bits: u64,
}

/// Resolves catchment zones against a shared [`CellIndex`].
///
/// Safe to share between threads. Two threads resolving the same key at
/// once both compute the zone and the last insert wins; the results are
/// identical.
pub struct ZoneResolver {
    index: Arc<CellIndex>,
    cache: RwLock<BTreeMap<ZoneKey, Arc<CatchmentZone>>>,
    index_scans: AtomicUsize,
}

impl ZoneResolver {
    /// Creates a resolver with an empty cache.
    #[must_use]
    pub fn new(index: Arc<CellIndex>) -> Self {
        Self {
            index,
            cache: RwLock::new(BTreeMap::new()),
            index_scans: AtomicUsize::new(0),
        }
    }

    /// The index zones are resolved against.
    #[must_use]
    pub fn index(&self) -> &CellIndex {
        &self.index
    }

    /// Swaps in a rebuilt index and drops every cached zone.
    pub fn reload(&mut self, index: Arc<CellIndex>) {
        log::info!(
            "Reloading cell index ({} -> {} cells), clearing {} cached zones",
            self.index.len(),
            index.len(),
            self.cached_zone_count()
        );
        self.index = index;
        self.write_cache().clear();
    }

    /// Number of zones currently cached.
    #[must_use]
    pub fn cached_zone_count(&self) -> usize {
        self.read_cache().len()
    }

    /// Number of spatial index scans performed so far (one per cache
    /// miss that reached the index).
    #[must_use]
    pub fn index_scan_count(&self) -> usize {
        self.index_scans.load(Ordering::Relaxed)
    }

    /// Resolves the zone of `center_cell_id` for `environment_class`.
    ///
    /// Members are the cells whose centroid lies within the class radius
    /// (plus [`RADIUS_SLACK`]) of the center cell's centroid.
    ///
    /// # Errors
    ///
    /// * [`ZoneError::InvalidConfig`] if the class has no strictly positive
    ///   radius in `params` (checked before any spatial work)
    /// * [`ZoneError::NotFound`] if the center cell is not indexed
    pub fn resolve_zone(
        &self,
        center_cell_id: &str,
        environment_class: &str,
        params: &EnvironmentParameters,
    ) -> Result<Arc<CatchmentZone>, ZoneError> {
        let radius_km = params.radius_km(environment_class)?;
        let environment_class = normalize_environment_class(environment_class);

        let key = ZoneKey {
            center_cell_id: center_cell_id.to_string(),
            environment_class,
            radius_bits: radius_km.to_bits(),
        };

        if let Some(zone) = self.read_cache().get(&key) {
            log::trace!(
                "Zone cache hit for {} / {}",
                key.center_cell_id,
                key.environment_class
            );
            return Ok(Arc::clone(zone));
        }

        let zone = Arc::new(self.compute(&key.center_cell_id, &key.environment_class, radius_km)?);
        self.write_cache().insert(key, Arc::clone(&zone));

        Ok(zone)
    }

    fn compute(
        &self,
        center_cell_id: &str,
        environment_class: &str,
        radius_km: f64,
    ) -> Result<CatchmentZone, ZoneError> {
        let center = self.index.centroid(center_cell_id)?;
        let max_distance_km = radius_km * RADIUS_SLACK;

        self.index_scans.fetch_add(1, Ordering::Relaxed);
        let candidates = self.index.candidates_within(center_cell_id, max_distance_km)?;

        let mut member_cell_ids = Vec::new();
        let mut distances = Vec::new();
        for cell_id in candidates {
            let distance = distance_between_km(center, self.index.centroid(cell_id)?);
            if distance <= max_distance_km {
                member_cell_ids.push(cell_id.to_string());
                distances.push(distance);
            }
        }

        let (max_observed_radius_km, mean_observed_radius_km) = if distances.is_empty() {
            (0.0, 0.0)
        } else {
            let max = distances.iter().copied().fold(0.0, f64::max);
            #[allow(clippy::cast_precision_loss)]
            let mean = distances.iter().sum::<f64>() / distances.len() as f64;
            (round_to(max, 2), round_to(mean, 2))
        };

        let stats = aggregate(member_cell_ids.iter().filter_map(|id| self.index.cell(id)));

        log::debug!(
            "Zone {center_cell_id} / {environment_class}: {} cells within {radius_km} km",
            member_cell_ids.len()
        );

        Ok(CatchmentZone {
            center_cell_id: center_cell_id.to_string(),
            environment_class: environment_class.to_string(),
            theoretical_radius_km: radius_km,
            member_cell_ids,
            max_observed_radius_km,
            mean_observed_radius_km,
            stats,
        })
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, BTreeMap<ZoneKey, Arc<CatchmentZone>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, BTreeMap<ZoneKey, Arc<CatchmentZone>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
