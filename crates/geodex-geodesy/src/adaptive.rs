//! Adaptive strategy selection

use crate::constants::{ADAPTIVE_PLANAR_LIMIT_KM, ADAPTIVE_SPHERICAL_LIMIT_KM};
use crate::haversine::Haversine;
use crate::planar::Planar;
use crate::traits::{DistanceStrategy, Result};
use crate::vincenty::Vincenty;

/// Picks a strategy from a cheap planar estimate.
///
/// | planar estimate | strategy |
/// |---|---|
/// | < 50 km | planar |
/// | < 10 000 km, or `high_accuracy` off | haversine |
/// | otherwise | vincenty |
#[derive(Debug, Clone, Copy, Default)]
pub struct Adaptive {
    high_accuracy: bool,
    planar: Planar,
    haversine: Haversine,
    vincenty: Vincenty,
}

impl Adaptive {
    pub fn new(high_accuracy: bool) -> Self {
        Self {
            high_accuracy,
            ..Default::default()
        }
    }

    /// Replace the ellipsoidal strategy used for long high-accuracy requests
    pub fn with_vincenty(mut self, vincenty: Vincenty) -> Self {
        self.vincenty = vincenty;
        self
    }

    pub fn high_accuracy(&self) -> bool {
        self.high_accuracy
    }

    /// Name of the strategy a request would be routed to
    pub fn select(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<&'static str> {
        let estimate = self.planar.calculate(lat1, lon1, lat2, lon2)?;
        Ok(self.route(estimate).name())
    }

    fn route(&self, estimate_km: f64) -> &dyn DistanceStrategy {
        if estimate_km < ADAPTIVE_PLANAR_LIMIT_KM {
            &self.planar
        } else if estimate_km < ADAPTIVE_SPHERICAL_LIMIT_KM || !self.high_accuracy {
            &self.haversine
        } else {
            &self.vincenty
        }
    }
}

impl DistanceStrategy for Adaptive {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        let estimate = self.planar.calculate(lat1, lon1, lat2, lon2)?;
        if estimate < ADAPTIVE_PLANAR_LIMIT_KM {
            return Ok(estimate);
        }
        let strategy = self.route(estimate);
        tracing::trace!("Adaptive distance: estimate={:.1} km, using {}", estimate, strategy.name());
        strategy.calculate(lat1, lon1, lat2, lon2)
    }
}
