//! Planar (metric) projection used for buffering cell geometries.
//!
//! Cells are stored in WGS84 longitude/latitude. Buffers are expressed in
//! meters, so cell geometries are projected once into spherical Web
//! Mercator (EPSG:3857 parameters) when the index is built.

use geo::{Coord, MapCoords as _, MultiPolygon};
use proj4rs::{proj::Proj, transform::transform};

use crate::SpatialError;
use crate::distance::EARTH_RADIUS_KM;

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";
const WEB_MERCATOR_PROJ4: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs";

/// Mean length of one degree of latitude, in kilometers.
const KM_PER_DEGREE_LAT: f64 = 111.195;

/// Sphere radius of the Web Mercator definition, in meters.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Extra headroom on top of the radius and latitude corrections.
const BUFFER_MARGIN: f64 = 1.001;

/// WGS84 -> Web Mercator transform.
pub struct WebMercator {
    from: Proj,
    to: Proj,
}

impl WebMercator {
    /// Builds the transform.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if a PROJ.4 definition is
    /// rejected.
    pub fn new() -> Result<Self, SpatialError> {
        let from = Proj::from_proj_string(WGS84_PROJ4).map_err(|e| SpatialError::Projection {
            message: format!("failed to build source PROJ.4 {WGS84_PROJ4}: {e:?}"),
        })?;
        let to = Proj::from_proj_string(WEB_MERCATOR_PROJ4).map_err(|e| {
            SpatialError::Projection {
                message: format!("failed to build target PROJ.4 {WEB_MERCATOR_PROJ4}: {e:?}"),
            }
        })?;

        Ok(Self { from, to })
    }

    /// Projects a longitude/latitude coordinate (degrees) to meters.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Projection`] if the transform fails or
    /// yields non-finite values (e.g. at the poles).
    pub fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, SpatialError> {
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.from, &self.to, &mut point).map_err(|e| SpatialError::Projection {
            message: format!("cannot project ({}, {}): {e:?}", coord.x, coord.y),
        })?;

        if !point.0.is_finite() || !point.1.is_finite() {
            return Err(SpatialError::Projection {
                message: format!("({}, {}) projects to a non-finite point", coord.x, coord.y),
            });
        }

        Ok(Coord {
            x: point.0,
            y: point.1,
        })
    }

    /// Projects every vertex of a geometry.
    ///
    /// # Errors
    ///
    /// Returns the first [`SpatialError::Projection`] encountered.
    pub fn project_geometry(
        &self,
        geometry: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError> {
        geometry.try_map_coords(|coord| self.project(coord))
    }
}

/// Planar meters per ground meter at latitude `lat` (degrees).
#[must_use]
pub fn scale_factor(lat: f64) -> f64 {
    1.0 / lat.to_radians().cos()
}

/// Converts a ground distance around `lat` into Web Mercator meters.
///
/// Ground distances are measured on the [`EARTH_RADIUS_KM`] sphere while
/// Mercator meters live on the larger [`MERCATOR_RADIUS_M`] sphere, so the
/// distance is first rescaled between the two. The latitude scale is taken
/// at the poleward edge of the distance so that a buffer of the returned
/// size covers at least `distance_km` of ground in every direction.
#[must_use]
pub fn planar_buffer_m(lat: f64, distance_km: f64) -> f64 {
    let edge_lat = (lat.abs() + distance_km / KM_PER_DEGREE_LAT).min(89.0);
    let sphere_ratio = MERCATOR_RADIUS_M / (EARTH_RADIUS_KM * 1000.0);
    distance_km * 1000.0 * sphere_ratio * scale_factor(edge_lat) * BUFFER_MARGIN
}
