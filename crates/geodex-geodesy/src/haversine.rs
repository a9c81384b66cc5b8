//! Spherical great-circle distance

use crate::constants::EARTH_RADIUS_MEAN_KM;
use crate::coordinate::Coordinate;
use crate::traits::{validate_pair, DistanceStrategy, Result};

/// Haversine distance on a sphere of the given radius.
///
/// Longitude deltas are used as-is; the half-angle sine squared is periodic
/// so deltas past 180° still give the short way round.
pub(crate) fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_km: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair past 1 for antipodal points
    2.0 * a.clamp(0.0, 1.0).sqrt().asin() * radius_km
}

/// Haversine distance in kilometres between two coordinates
pub fn haversine_km(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine(
        from.latitude(),
        from.longitude(),
        to.latitude(),
        to.longitude(),
        EARTH_RADIUS_MEAN_KM,
    )
}

/// Great-circle distance on a spherical Earth
#[derive(Debug, Clone, Copy)]
pub struct Haversine {
    radius_km: f64,
}

impl Haversine {
    pub fn new() -> Self {
        Self {
            radius_km: EARTH_RADIUS_MEAN_KM,
        }
    }

    /// Use a custom sphere radius
    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }
}

impl Default for Haversine {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceStrategy for Haversine {
    fn name(&self) -> &'static str {
        "haversine"
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        validate_pair(lat1, lon1, lat2, lon2)?;
        Ok(haversine(lat1, lon1, lat2, lon2, self.radius_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        // New York to London, about 5570 km
        let d = Haversine::new()
            .calculate(40.7128, -74.0060, 51.5074, -0.1278)
            .unwrap();
        assert!((d - 5570.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn test_antimeridian_is_short() {
        let d = Haversine::new().calculate(0.0, 179.5, 0.0, -179.5).unwrap();
        assert!((d - 111.2).abs() < 0.5, "got {d}");
    }

    #[test]
    fn test_antipodal_is_finite() {
        let d = Haversine::new().calculate(0.0, 0.0, 0.0, 180.0).unwrap();
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_MEAN_KM).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Haversine::new().calculate(91.0, 0.0, 0.0, 0.0).is_err());
        assert!(Haversine::new().calculate(0.0, 0.0, 0.0, -181.0).is_err());
    }
}
