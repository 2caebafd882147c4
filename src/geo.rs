//! Great-circle distance and forward-geodesic helpers.
//!
//! Grounded on `examples/original_source/lib/index/geo.go`: haversine
//! distance for ranking, a forward-bearing destination point for turning a
//! radius query into a bounding rect.

use std::f64::consts::PI;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[must_use]
pub fn degrees_to_radians(deg: f64) -> f64 {
    deg * (PI / 180.0)
}

#[must_use]
fn radians_to_degrees(rad: f64) -> f64 {
    rad * (180.0 / PI)
}

/// `hav(x) = (1 - cos x) / 2`
#[must_use]
pub fn hav(x: f64) -> f64 {
    (1.0 - x.cos()) / 2.0
}

/// Great-circle distance between two points, in kilometers.
#[must_use]
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = degrees_to_radians(lat1);
    let lon1 = degrees_to_radians(lon1);
    let lat2 = degrees_to_radians(lat2);
    let lon2 = degrees_to_radians(lon2);

    let a = hav(lat1 - lat2) + lat1.cos() * lat2.cos() * hav(lon1 - lon2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Forward geodesic: the point reached from `(lat, lon)` travelling
/// `dist_km` along `bearing_deg` (degrees clockwise from north).
#[must_use]
pub fn destination_point(lat: f64, lon: f64, bearing_deg: f64, dist_km: f64) -> (f64, f64) {
    let angular_dist = dist_km / EARTH_RADIUS_KM;
    let bearing = degrees_to_radians(bearing_deg);
    let lat1 = degrees_to_radians(lat);
    let lon1 = degrees_to_radians(lon);

    let lat2 = (lat1.sin() * angular_dist.cos() + lat1.cos() * angular_dist.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular_dist.sin() * lat1.cos())
            .atan2(angular_dist.cos() - lat1.sin() * lat2.sin());
    let lon2 = (lon2 + 3.0 * PI).rem_euclid(2.0 * PI) - PI;

    (radians_to_degrees(lat2), radians_to_degrees(lon2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_of_point_with_itself_is_zero() {
        assert!(haversine(-7.8, 110.4, -7.8, 110.4) < 1e-9);
    }

    #[test]
    fn haversine_known_distance_jakarta_bandung() {
        // Jakarta ~ (-6.2, 106.8), Bandung ~ (-6.9, 107.6); ~120km apart.
        let d = haversine(-6.2, 106.8, -6.9, 107.6);
        assert!((100.0..=140.0).contains(&d), "got {d}");
    }

    #[test]
    fn destination_point_round_trips_distance() {
        let (lat, lon) = (-7.7672, 110.3763);
        let (dlat, dlon) = destination_point(lat, lon, 45.0, 10.0);
        let back = haversine(lat, lon, dlat, dlon);
        assert!((back - 10.0).abs() < 0.05, "got {back}");
    }

    #[test]
    fn destination_point_bearing_north_increases_latitude() {
        let (lat, lon) = (0.0, 0.0);
        let (dlat, _dlon) = destination_point(lat, lon, 0.0, 100.0);
        assert!(dlat > lat);
    }
}
