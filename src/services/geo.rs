//! Geospatial verification for picket-line check-ins.
//!
//! Pure math, no side effects: Haversine distance on a spherical-Earth
//! approximation, and a radius check against the fund's picket location.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (spherical approximation).
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default allowed distance from the picket location.
pub const DEFAULT_CHECKIN_RADIUS_METERS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationVerification {
    pub verified: bool,
    pub distance_meters: f64,
}

/// Haversine great-circle distance in meters.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    // Clamp so identical and antipodal points stay inside asin's domain
    // instead of producing NaN from rounding.
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

    EARTH_RADIUS_METERS * c
}

pub fn distance_between(a: Coordinates, b: Coordinates) -> f64 {
    haversine_distance_meters(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Verify a check-in position against the picket location.
pub fn verify_location(
    check_in: Coordinates,
    picket: Coordinates,
    radius_meters: f64,
) -> LocationVerification {
    let distance_meters = distance_between(check_in, picket);
    LocationVerification {
        verified: distance_meters <= radius_meters,
        distance_meters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_distance() {
        let d = haversine_distance_meters(45.5, -73.6, 45.5, -73.6);
        assert_eq!(d, 0.0);
        assert!(!d.is_nan());
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_distance_meters(40.7128, -74.0060, 34.0522, -118.2437);
        let ba = haversine_distance_meters(34.0522, -118.2437, 40.7128, -74.0060);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        // (0,0) -> (0,1) is ~111,195m on a 6371km sphere
        let d = haversine_distance_meters(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = haversine_distance_meters(0.0, 0.0, 0.0, 180.0);
        assert!(!d.is_nan());
        // Half the Earth's circumference
        assert!((d - std::f64::consts::PI * 6_371_000.0).abs() < 1.0);
    }

    #[test]
    fn verify_within_radius() {
        let picket = Coordinates {
            latitude: 43.6532,
            longitude: -79.3832,
        };
        // ~50m north of the picket
        let nearby = Coordinates {
            latitude: 43.65365,
            longitude: -79.3832,
        };
        let result = verify_location(nearby, picket, DEFAULT_CHECKIN_RADIUS_METERS);
        assert!(result.verified);
        assert!(result.distance_meters < 100.0);
    }

    #[test]
    fn verify_outside_radius() {
        let picket = Coordinates {
            latitude: 43.6532,
            longitude: -79.3832,
        };
        // ~1.1km north
        let far = Coordinates {
            latitude: 43.6632,
            longitude: -79.3832,
        };
        let result = verify_location(far, picket, DEFAULT_CHECKIN_RADIUS_METERS);
        assert!(!result.verified);
        assert!(result.distance_meters > 1_000.0);
    }
}
