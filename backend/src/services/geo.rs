//! Great-circle distance and geofence checks.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters between two coordinates given in degrees.
///
/// Inputs are not range checked; out-of-range values yield a defined but
/// meaningless result.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // clamp guards against a drifting just above 1.0 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Circle around a department within which students count as present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_m: f64,
}

impl Geofence {
    pub const fn new(center: GeoPoint, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    pub fn distance_from_center(&self, point: &GeoPoint) -> f64 {
        self.center.distance_to(point)
    }

    /// A point exactly on the boundary is inside.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_from_center(point) <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPARTMENT: GeoPoint = GeoPoint::new(20.0, 85.0);

    /// Moves `meters` due north along the meridian.
    fn north_of(point: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(point.lat + (meters / EARTH_RADIUS_METERS).to_degrees(), point.lng)
    }

    #[test]
    fn identical_points_are_zero_apart() {
        for point in [
            DEPARTMENT,
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-89.9, 179.9),
            GeoPoint::new(51.5, -0.12),
        ] {
            assert_eq!(point.distance_to(&point), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(21.1007046, 85.0906913);
        let b = GeoPoint::new(-33.8688, 151.2093);
        assert_eq!(a.distance_to(&b), b.distance_to(&a));
        assert_eq!(
            haversine_distance(a.lat, a.lng, DEPARTMENT.lat, DEPARTMENT.lng),
            haversine_distance(DEPARTMENT.lat, DEPARTMENT.lng, a.lat, a.lng)
        );
    }

    #[test]
    fn meridian_distance_matches_arc_length() {
        let far = north_of(DEPARTMENT, 200_000.0);
        let distance = DEPARTMENT.distance_to(&far);
        assert!((distance - 200_000.0).abs() < 1e-3, "got {distance}");
    }

    #[test]
    fn antipodal_points_are_half_circumference_apart() {
        let distance = haversine_distance(0.0, 0.0, 0.0, 180.0);
        let expected = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((distance - expected).abs() < 1e-3);
    }

    #[test]
    fn geofence_boundary_at_199_and_201_meters() {
        let fence = Geofence::new(DEPARTMENT, 200.0);
        assert!(fence.contains(&north_of(DEPARTMENT, 199.0)));
        assert!(!fence.contains(&north_of(DEPARTMENT, 201.0)));
        assert!(fence.contains(&DEPARTMENT));
    }
}
