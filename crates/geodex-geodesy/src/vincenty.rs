//! Ellipsoidal distance (Vincenty inverse formula on WGS84)

use crate::constants::{
    DEFAULT_COORDINATE_PRECISION, VINCENTY_MAX_ITERATIONS, VINCENTY_TOLERANCE, WGS84_A, WGS84_B,
    WGS84_F,
};
use crate::haversine::Haversine;
use crate::traits::{validate_pair, DistanceStrategy, Result};

/// Iterative geodesic distance on the WGS84 ellipsoid.
///
/// Sub-millimetre accurate where it converges. Nearly antipodal pairs may
/// not converge within `max_iterations`; those fall back to [`Haversine`].
#[derive(Debug, Clone, Copy)]
pub struct Vincenty {
    max_iterations: u32,
    tolerance: f64,
}

/// Outcome of the lambda iteration
enum Solution {
    Coincident,
    Converged(f64),
    Diverged,
}

impl Vincenty {
    pub fn new() -> Self {
        Self {
            max_iterations: VINCENTY_MAX_ITERATIONS,
            tolerance: VINCENTY_TOLERANCE,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn solve(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Solution {
        let a = WGS84_A / 1000.0;
        let f = WGS84_F;
        let b = WGS84_B / 1000.0;

        let l = (lon2 - lon1).to_radians();
        let u1 = ((1.0 - f) * lat1.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * lat2.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;

        let mut sin_sigma = 0.0;
        let mut cos_sigma = 0.0;
        let mut sigma = 0.0;
        let mut cos2_alpha = 0.0;
        let mut cos_2sigma_m = 0.0;

        for iteration in 0..self.max_iterations {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();
            if sin_sigma == 0.0 {
                return Solution::Coincident;
            }

            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);

            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos2_alpha = 1.0 - sin_alpha * sin_alpha;
            // equatorial line
            cos_2sigma_m = if cos2_alpha == 0.0 {
                0.0
            } else {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
            };

            let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

            if (lambda - previous).abs() <= self.tolerance {
                tracing::trace!("Vincenty converged after {} iterations", iteration + 1);
                converged = true;
                break;
            }
        }

        if !converged {
            return Solution::Diverged;
        }

        let u_sq = cos2_alpha * (a * a - b * b) / (b * b);
        let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma.powi(2))
                            * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));

        let s = b * big_a * (sigma - delta_sigma);
        if s.is_finite() {
            Solution::Converged(s)
        } else {
            Solution::Diverged
        }
    }
}

impl Default for Vincenty {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceStrategy for Vincenty {
    fn name(&self) -> &'static str {
        "vincenty"
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        validate_pair(lat1, lon1, lat2, lon2)?;

        if (lat1 - lat2).abs() < DEFAULT_COORDINATE_PRECISION
            && (lon1 - lon2).abs() < DEFAULT_COORDINATE_PRECISION
        {
            return Ok(0.0);
        }

        match self.solve(lat1, lon1, lat2, lon2) {
            Solution::Coincident => Ok(0.0),
            Solution::Converged(km) => Ok(km),
            Solution::Diverged => {
                tracing::debug!(
                    "Vincenty did not converge for ({}, {}) -> ({}, {}); using haversine",
                    lat1,
                    lon1,
                    lat2,
                    lon2
                );
                Haversine::new().calculate(lat1, lon1, lat2, lon2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::Haversine;

    #[test]
    fn test_reference_distance() {
        // Flinders Peak to Buninyong, the classic Vincenty check: 54.972271 km
        let d = Vincenty::new()
            .calculate(-37.951_033_4, 144.424_867_8, -37.652_821_1, 143.926_495_3)
            .unwrap();
        assert!((d - 54.972_271).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_semi_minor_axis_matches_flattening() {
        assert!(((1.0 - WGS84_F) * WGS84_A - WGS84_B).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_points() {
        let v = Vincenty::new();
        assert_eq!(v.calculate(10.0, 20.0, 10.0, 20.0).unwrap(), 0.0);
        assert_eq!(v.calculate(10.0, 20.0, 10.000_000_1, 20.0).unwrap(), 0.0);
    }

    #[test]
    fn test_close_to_haversine() {
        let v = Vincenty::new().calculate(40.7128, -74.0060, 51.5074, -0.1278).unwrap();
        let h = Haversine::new().calculate(40.7128, -74.0060, 51.5074, -0.1278).unwrap();
        assert!((v - h).abs() / h < 0.005);
    }

    #[test]
    fn test_antipodal_falls_back() {
        let v = Vincenty::new().calculate(0.0, 0.0, 0.5, 179.7).unwrap();
        assert!(v.is_finite());
        assert!(v > 19_000.0 && v < 20_100.0, "got {v}");
    }

    #[test]
    fn test_iteration_cap_forces_fallback() {
        let capped = Vincenty::new().with_max_iterations(1).with_tolerance(0.0);
        let h = Haversine::new().calculate(40.7128, -74.0060, 51.5074, -0.1278).unwrap();
        let d = capped.calculate(40.7128, -74.0060, 51.5074, -0.1278).unwrap();
        assert_eq!(d, h);
    }
}
