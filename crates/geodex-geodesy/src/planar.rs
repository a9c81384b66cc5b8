//! Equirectangular small-distance approximation

use std::f64::consts::PI;

use crate::constants::{max_surface_distance_km, EARTH_RADIUS_MEAN_KM};
use crate::traits::{validate_pair, DistanceStrategy, Result};

/// Flat projection scaled by the cosine of the mean latitude.
///
/// Cheap and good to well under a percent below ~100 km; degrades with
/// distance and near the poles. The longitude delta is wrapped so pairs
/// straddling the antimeridian stay close, and results are capped at the
/// longest possible surface distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl Planar {
    pub fn new() -> Self {
        Self
    }
}

impl DistanceStrategy for Planar {
    fn name(&self) -> &'static str {
        "planar"
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        validate_pair(lat1, lon1, lat2, lon2)?;

        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let mut d_lambda = (lon2 - lon1).to_radians();
        if d_lambda > PI {
            d_lambda -= 2.0 * PI;
        } else if d_lambda < -PI {
            d_lambda += 2.0 * PI;
        }

        let x = d_lambda * ((phi1 + phi2) / 2.0).cos();
        let y = phi2 - phi1;
        let km = EARTH_RADIUS_MEAN_KM * (x * x + y * y).sqrt();
        Ok(km.min(max_surface_distance_km()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::Haversine;

    #[test]
    fn test_short_distance_matches_sphere() {
        let p = Planar.calculate(48.8566, 2.3522, 48.8606, 2.3376).unwrap();
        let h = Haversine::new().calculate(48.8566, 2.3522, 48.8606, 2.3376).unwrap();
        assert!((p - h).abs() < 0.001, "planar {p} haversine {h}");
    }

    #[test]
    fn test_wraps_antimeridian() {
        let d = Planar.calculate(0.0, 179.9, 0.0, -179.9).unwrap();
        assert!(d < 25.0, "got {d}");
    }

    #[test]
    fn test_capped() {
        let d = Planar.calculate(-90.0, -180.0, 90.0, 0.0).unwrap();
        assert!(d <= max_surface_distance_km());
    }
}
