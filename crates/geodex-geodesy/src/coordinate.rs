//! Validated geographic coordinates and the coordinate extraction interface

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{GeodesyError, GeodesyResult};

/// Validate a longitude in degrees
pub fn validate_longitude(lon: f64) -> GeodesyResult<()> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(GeodesyError::InvalidCoordinate(format!(
            "longitude {lon} must be between -180 and 180"
        )));
    }
    Ok(())
}

/// Validate a latitude in degrees
pub fn validate_latitude(lat: f64) -> GeodesyResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GeodesyError::InvalidCoordinate(format!(
            "latitude {lat} must be between -90 and 90"
        )));
    }
    Ok(())
}

/// Validate an altitude
pub fn validate_altitude(alt: f64) -> GeodesyResult<()> {
    if !alt.is_finite() {
        return Err(GeodesyError::InvalidCoordinate(format!(
            "altitude {alt} must be a finite number"
        )));
    }
    Ok(())
}

/// A geographic position.
///
/// Longitude and latitude are degrees, altitude is metres. The ranges are
/// checked on construction and the value is immutable afterwards, so every
/// `Coordinate` in existence is valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    longitude: f64,
    latitude: f64,
    altitude: f64,
}

impl Coordinate {
    /// Create a coordinate at ground level
    pub fn new(longitude: f64, latitude: f64) -> GeodesyResult<Self> {
        Self::with_altitude(longitude, latitude, 0.0)
    }

    /// Create a coordinate with an explicit altitude
    pub fn with_altitude(longitude: f64, latitude: f64, altitude: f64) -> GeodesyResult<Self> {
        validate_longitude(longitude)?;
        validate_latitude(latitude)?;
        validate_altitude(altitude)?;
        Ok(Self {
            longitude,
            latitude,
            altitude,
        })
    }

    /// Build from a slice of `[lon, lat, alt?]`; components past the third are ignored
    pub fn from_slice(values: &[f64]) -> GeodesyResult<Self> {
        match values {
            [lon, lat] => Self::new(*lon, *lat),
            [lon, lat, alt, ..] => Self::with_altitude(*lon, *lat, *alt),
            _ => Err(GeodesyError::InvalidCoordinate(format!(
                "expected (lon, lat[, alt]), got {} component(s)",
                values.len()
            ))),
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// `(lon, lat, alt)`
    pub fn to_tuple(&self) -> (f64, f64, f64) {
        (self.longitude, self.latitude, self.altitude)
    }

    /// JSON object with `longitude`, `latitude` and `altitude` keys
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "longitude": self.longitude,
            "latitude": self.latitude,
            "altitude": self.altitude,
        })
    }

    /// Great-circle distance in kilometres
    pub fn distance_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        let other = other.get_coordinates()?;
        Some(crate::haversine::haversine_km(self, &other))
    }

    /// Initial bearing in degrees, `[0, 360)`
    pub fn bearing_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        let other = other.get_coordinates()?;
        Some(crate::library::initial_bearing(self, &other))
    }

    /// Geographic midpoint
    pub fn midpoint_to(&self, other: &impl HasCoordinates) -> Option<Coordinate> {
        let other = other.get_coordinates()?;
        crate::library::great_circle_midpoint(self, &other).ok()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.longitude, self.latitude, self.altitude)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Parses `"lon,lat[,alt]"`, tolerating whitespace around components
impl FromStr for Coordinate {
    type Err = GeodesyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                GeodesyError::InvalidCoordinate(format!("could not parse '{s}': {e}"))
            })?;
        Self::from_slice(&parts)
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = GeodesyError;

    fn try_from((lon, lat): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lon, lat)
    }
}

impl TryFrom<(f64, f64, f64)> for Coordinate {
    type Error = GeodesyError;

    fn try_from((lon, lat, alt): (f64, f64, f64)) -> Result<Self, Self::Error> {
        Self::with_altitude(lon, lat, alt)
    }
}

/// Permissive conversion from a dynamic value.
///
/// Accepts numeric arrays (numeric strings inside the array are parsed),
/// `"lon,lat[,alt]"` strings and objects carrying `longitude`/`latitude`
/// and optionally `altitude`.
impl TryFrom<&Value> for Coordinate {
    type Error = GeodesyError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(number_of)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        GeodesyError::InvalidCoordinate(format!(
                            "expected numeric (lon, lat[, alt]), got {value}"
                        ))
                    })?;
                Self::from_slice(&parts)
            }
            Value::Object(map) => {
                let field = |key: &str| map.get(key).and_then(number_of);
                match (field("longitude"), field("latitude")) {
                    (Some(lon), Some(lat)) => {
                        Self::with_altitude(lon, lat, field("altitude").unwrap_or(0.0))
                    }
                    _ => Err(GeodesyError::InvalidCoordinate(format!(
                        "object needs numeric longitude and latitude, got {value}"
                    ))),
                }
            }
            other => Err(GeodesyError::InvalidCoordinate(format!(
                "unsupported coordinate value: {other}"
            ))),
        }
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a dynamic value into a coordinate, logging instead of failing.
///
/// `null` is treated as "no coordinate" without a warning.
pub fn coerce_coordinate(value: &Value, context: &str) -> Option<Coordinate> {
    if value.is_null() {
        return None;
    }
    match Coordinate::try_from(value) {
        Ok(coord) => Some(coord),
        Err(err) => {
            tracing::warn!("Skipping {}: coordinate extraction failed: {}", context, err);
            None
        }
    }
}

/// Anything that can yield a single representative coordinate.
///
/// Geospatial predicates and the geodesic library accept any implementor;
/// `None` means the element has no usable position and is skipped.
pub trait HasCoordinates {
    fn get_coordinates(&self) -> Option<Coordinate>;
}

impl HasCoordinates for Coordinate {
    fn get_coordinates(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

/// `(lon, lat)`; out-of-range pairs yield `None`
impl HasCoordinates for (f64, f64) {
    fn get_coordinates(&self) -> Option<Coordinate> {
        match Coordinate::new(self.0, self.1) {
            Ok(c) => Some(c),
            Err(err) => {
                tracing::warn!("Ignoring coordinate pair {:?}: {}", self, err);
                None
            }
        }
    }
}

/// `(lon, lat, alt)`; invalid triples yield `None`
impl HasCoordinates for (f64, f64, f64) {
    fn get_coordinates(&self) -> Option<Coordinate> {
        match Coordinate::with_altitude(self.0, self.1, self.2) {
            Ok(c) => Some(c),
            Err(err) => {
                tracing::warn!("Ignoring coordinate triple {:?}: {}", self, err);
                None
            }
        }
    }
}

impl<T: HasCoordinates + ?Sized> HasCoordinates for &T {
    fn get_coordinates(&self) -> Option<Coordinate> {
        (**self).get_coordinates()
    }
}

impl<T: HasCoordinates + ?Sized> HasCoordinates for Box<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        (**self).get_coordinates()
    }
}

impl<T: HasCoordinates + ?Sized> HasCoordinates for Rc<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        (**self).get_coordinates()
    }
}

impl<T: HasCoordinates + ?Sized> HasCoordinates for Arc<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        (**self).get_coordinates()
    }
}

/// A mutably borrowed cell yields `None` rather than panicking
impl<T: HasCoordinates + ?Sized> HasCoordinates for RefCell<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.try_borrow().ok()?.get_coordinates()
    }
}

impl<T: HasCoordinates> HasCoordinates for Option<T> {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.as_ref()?.get_coordinates()
    }
}
