//! Distance checks between players and checkpoints

use crate::error::{GameError, GameResult};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres (haversine)
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

pub fn is_near(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_m: f64) -> bool {
    distance_m(lat1, lon1, lat2, lon2) <= radius_m
}

/// Reject coordinates outside the WGS84 range (and NaN)
pub fn validate_coordinates(latitude: f64, longitude: f64) -> GameResult<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GameError::InvalidInput(format!(
            "Latitude {} out of range",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GameError::InvalidInput(format!(
            "Longitude {} out of range",
            longitude
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero() {
        assert!(distance_m(37.7749, -122.4194, 37.7749, -122.4194) < 1e-6);
    }

    #[test]
    fn test_distance_known_pair() {
        // Ferry Building to Coit Tower, roughly 1.3 km
        let d = distance_m(37.7955, -122.3937, 37.8024, -122.4058);
        assert!((1_200.0..1_400.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_one_degree_latitude() {
        let d = distance_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn test_is_near() {
        // ~0.0005 deg latitude is ~55 m
        assert!(is_near(48.8584, 2.2945, 48.8589, 2.2945, 100.0));
        assert!(!is_near(48.8584, 2.2945, 48.8684, 2.2945, 100.0));
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(0.0, 0.0).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.5).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }
}
