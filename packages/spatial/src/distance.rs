//! Great-circle distance on a spherical Earth.

use chalandise_geography_models::LatLon;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two WGS84 coordinates given in
/// degrees.
///
/// Identical coordinates yield exactly `0.0`, and the result does not
/// depend on argument order.
#[must_use]
pub fn great_circle_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// [`great_circle_distance_km`] between two [`LatLon`] values.
#[must_use]
pub fn distance_between_km(a: LatLon, b: LatLon) -> f64 {
    great_circle_distance_km(a.lat, a.lon, b.lat, b.lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: LatLon = LatLon::new(48.8566, 2.3522);
    const LYON: LatLon = LatLon::new(45.7640, 4.8357);

    #[test]
    fn identical_points_are_zero() {
        for p in [PARIS, LYON, LatLon::new(0.0, 0.0), LatLon::new(-33.9, 151.2)] {
            assert_eq!(distance_between_km(p, p), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let pairs = [
            (PARIS, LYON),
            (LatLon::new(43.2965, 5.3698), LatLon::new(50.6292, 3.0573)),
            (LatLon::new(-12.0, 170.0), LatLon::new(12.0, -170.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_between_km(a, b), distance_between_km(b, a));
        }
    }

    #[test]
    fn paris_to_lyon() {
        let d = distance_between_km(PARIS, LYON);
        assert!((391.0..=393.0).contains(&d), "Paris-Lyon was {d} km");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = great_circle_distance_km(45.0, 3.0, 46.0, 3.0);
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6, "got {d}, expected {expected}");
    }
}
