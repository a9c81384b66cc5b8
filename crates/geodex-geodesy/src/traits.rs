//! Distance strategy trait

use crate::coordinate::{validate_latitude, validate_longitude, Coordinate};

pub use crate::error::{GeodesyError, GeodesyResult as Result};

/// A way of measuring the surface distance between two positions.
///
/// Every strategy takes degrees in `(lat1, lon1, lat2, lon2)` order, checks
/// their ranges and returns kilometres, so strategies are interchangeable.
pub trait DistanceStrategy: Send + Sync {
    /// Short identifier used in logs and configuration
    fn name(&self) -> &'static str;

    /// Distance in kilometres
    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64>;

    /// Distance in kilometres between two validated coordinates
    fn between(&self, from: &Coordinate, to: &Coordinate) -> Result<f64> {
        self.calculate(
            from.latitude(),
            from.longitude(),
            to.latitude(),
            to.longitude(),
        )
    }
}

/// Range-check both endpoints of a distance request
pub(crate) fn validate_pair(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<()> {
    validate_latitude(lat1)?;
    validate_longitude(lon1)?;
    validate_latitude(lat2)?;
    validate_longitude(lon2)?;
    Ok(())
}

impl<S: DistanceStrategy + ?Sized> DistanceStrategy for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        (**self).calculate(lat1, lon1, lat2, lon2)
    }
}

impl<S: DistanceStrategy + ?Sized> DistanceStrategy for std::sync::Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        (**self).calculate(lat1, lon1, lat2, lon2)
    }
}
