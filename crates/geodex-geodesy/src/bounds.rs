//! Latitude/longitude bounding boxes

use serde::{Deserialize, Serialize};

use crate::coordinate::{validate_latitude, validate_longitude, Coordinate};
use crate::error::{GeodesyError, GeodesyResult};

/// A latitude band crossed with a longitude span.
///
/// When `west > east` the span wraps across the antimeridian, so
/// `west = 170, east = -170` covers 170..180 and -180..-170.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Build validated bounds
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> GeodesyResult<Self> {
        let bounds = Self {
            north,
            south,
            east,
            west,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Check that `-90 <= south <= north <= 90` and both longitudes are in range
    pub fn validate(&self) -> GeodesyResult<()> {
        if validate_latitude(self.north).is_err() || validate_latitude(self.south).is_err() {
            return Err(GeodesyError::InvalidBounds(format!(
                "latitudes must be within [-90, 90], got north={} south={}",
                self.north, self.south
            )));
        }
        if self.south > self.north {
            return Err(GeodesyError::InvalidBounds(format!(
                "south ({}) must not exceed north ({})",
                self.south, self.north
            )));
        }
        if validate_longitude(self.east).is_err() || validate_longitude(self.west).is_err() {
            return Err(GeodesyError::InvalidBounds(format!(
                "longitudes must be within [-180, 180], got east={} west={}",
                self.east, self.west
            )));
        }
        Ok(())
    }

    /// True when the longitude span crosses the antimeridian
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains_lon_lat(&self, lon: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.west || lon <= self.east
        } else {
            self.west <= lon && lon <= self.east
        }
    }

    pub fn contains(&self, coord: &Coordinate) -> bool {
        self.contains_lon_lat(coord.longitude(), coord.latitude())
    }

    /// Smallest non-wrapping box around the given coordinates
    pub fn enclosing<'a>(coords: impl IntoIterator<Item = &'a Coordinate>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            north: first.latitude(),
            south: first.latitude(),
            east: first.longitude(),
            west: first.longitude(),
        };
        for c in iter {
            bounds.north = bounds.north.max(c.latitude());
            bounds.south = bounds.south.min(c.latitude());
            bounds.east = bounds.east.max(c.longitude());
            bounds.west = bounds.west.min(c.longitude());
        }
        Some(bounds)
    }

    /// `(min_lon, min_lat, max_lon, max_lat)`
    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.west, self.south, self.east, self.north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(Bounds::new(10.0, -10.0, 20.0, -20.0).is_ok());
        assert!(Bounds::new(-10.0, 10.0, 20.0, -20.0).is_err());
        assert!(Bounds::new(91.0, 0.0, 20.0, -20.0).is_err());
        assert!(Bounds::new(10.0, 0.0, 181.0, -20.0).is_err());
        assert!(Bounds::new(10.0, 0.0, 20.0, -181.0).is_err());
    }

    #[test]
    fn test_antimeridian_wrap() {
        let b = Bounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
        assert!(b.crosses_antimeridian());
        assert!(b.contains_lon_lat(179.0, 0.0));
        assert!(b.contains_lon_lat(-179.0, 0.0));
        assert!(!b.contains_lon_lat(0.0, 0.0));
        assert!(!b.contains_lon_lat(179.0, 11.0));
    }

    #[test]
    fn test_enclosing() {
        let coords = [
            Coordinate::new(-5.0, 40.0).unwrap(),
            Coordinate::new(3.0, 51.0).unwrap(),
            Coordinate::new(1.0, 45.0).unwrap(),
        ];
        let b = Bounds::enclosing(&coords).unwrap();
        assert_eq!(b.to_tuple(), (-5.0, 40.0, 3.0, 51.0));
        assert!(Bounds::enclosing(&[] as &[Coordinate]).is_none());
    }
}
