//! Geodesic primitives over anything that yields coordinates

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Instant;

use crate::bounds::Bounds;
use crate::constants::SLOW_OPERATION_MS;
use crate::coordinate::{Coordinate, HasCoordinates};
use crate::error::{GeodesyError, GeodesyResult};
use crate::haversine::Haversine;
use crate::traits::DistanceStrategy;
use crate::units::DistanceUnit;

/// Initial great-circle bearing in degrees, normalized to `[0, 360)`
pub fn initial_bearing(from: &Coordinate, to: &Coordinate) -> f64 {
    let phi1 = from.latitude().to_radians();
    let phi2 = to.latitude().to_radians();
    let d_lambda = (to.longitude() - from.longitude()).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    // tiny negative angles round up to 360
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Great-circle midpoint at ground level
pub fn great_circle_midpoint(a: &Coordinate, b: &Coordinate) -> GeodesyResult<Coordinate> {
    let phi1 = a.latitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let lambda1 = a.longitude().to_radians();
    let d_lambda = (b.longitude() - a.longitude()).to_radians();

    let bx = phi2.cos() * d_lambda.cos();
    let by = phi2.cos() * d_lambda.sin();

    let lat = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lon = lambda1 + by.atan2(phi1.cos() + bx);

    let lon = (lon.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
    on_surface(lon, lat.to_degrees())
}

/// Spherical linear interpolation for `0 < fraction < 1`
fn slerp(a: &Coordinate, b: &Coordinate, fraction: f64) -> GeodesyResult<Coordinate> {
    let phi1 = a.latitude().to_radians();
    let lambda1 = a.longitude().to_radians();
    let phi2 = b.latitude().to_radians();
    let lambda2 = b.longitude().to_radians();

    let d = 2.0
        * (((phi1 - phi2) / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * ((lambda1 - lambda2) / 2.0).sin().powi(2))
        .clamp(0.0, 1.0)
        .sqrt()
        .asin();
    if d == 0.0 {
        return Ok(*a);
    }
    if (d - PI).abs() < f64::EPSILON {
        return Err(GeodesyError::Calculation(
            "interpolation between antipodal points is undefined".to_string(),
        ));
    }

    let fa = ((1.0 - fraction) * d).sin() / d.sin();
    let fb = (fraction * d).sin() / d.sin();

    let x = fa * phi1.cos() * lambda1.cos() + fb * phi2.cos() * lambda2.cos();
    let y = fa * phi1.cos() * lambda1.sin() + fb * phi2.cos() * lambda2.sin();
    let z = fa * phi1.sin() + fb * phi2.sin();

    let lat = z.atan2((x * x + y * y).sqrt()).to_degrees();
    let lon = y.atan2(x).to_degrees();
    if !lat.is_finite() || !lon.is_finite() {
        return Err(GeodesyError::Calculation(format!(
            "interpolation produced a non-finite point at fraction {fraction}"
        )));
    }
    on_surface(lon, lat)
}

/// Trigonometric results are in range up to rounding
fn on_surface(lon: f64, lat: f64) -> GeodesyResult<Coordinate> {
    Coordinate::new(lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0))
        .map_err(|e| GeodesyError::Calculation(e.to_string()))
}

fn timed<R>(operation: &str, f: impl FnOnce() -> R) -> R {
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed().as_millis();
    if elapsed > SLOW_OPERATION_MS {
        tracing::warn!("Slow geodesic operation: {} took {} ms", operation, elapsed);
    }
    result
}

/// Distance, bearing, midpoint, interpolation and bounding boxes.
///
/// Inputs are any [`HasCoordinates`] value; when an input yields no
/// coordinate the result is `None` rather than an error. Distances go
/// through the configured [`DistanceStrategy`] (haversine by default).
#[derive(Clone)]
pub struct GeodesicLibrary {
    strategy: Arc<dyn DistanceStrategy>,
}

impl GeodesicLibrary {
    pub fn new() -> Self {
        Self::with_strategy(Haversine::new())
    }

    pub fn with_strategy(strategy: impl DistanceStrategy + 'static) -> Self {
        Self {
            strategy: Arc::new(strategy),
        }
    }

    pub fn from_shared(strategy: Arc<dyn DistanceStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &dyn DistanceStrategy {
        self.strategy.as_ref()
    }

    /// Distance between two positions in the requested unit
    pub fn distance(
        &self,
        from: &impl HasCoordinates,
        to: &impl HasCoordinates,
        unit: DistanceUnit,
    ) -> GeodesyResult<Option<f64>> {
        timed("distance", || -> GeodesyResult<Option<f64>> {
            let (Some(a), Some(b)) = (from.get_coordinates(), to.get_coordinates()) else {
                tracing::debug!("Distance skipped: missing coordinates");
                return Ok(None);
            };
            let km = self.strategy.between(&a, &b)?;
            Ok(Some(unit.from_km(km)))
        })
    }

    /// Initial bearing in degrees, `[0, 360)`
    pub fn bearing(&self, from: &impl HasCoordinates, to: &impl HasCoordinates) -> Option<f64> {
        timed("bearing", || {
            let a = from.get_coordinates()?;
            let b = to.get_coordinates()?;
            Some(initial_bearing(&a, &b))
        })
    }

    /// Great-circle midpoint
    pub fn midpoint(
        &self,
        a: &impl HasCoordinates,
        b: &impl HasCoordinates,
    ) -> Option<Coordinate> {
        timed("midpoint", || {
            let a = a.get_coordinates()?;
            let b = b.get_coordinates()?;
            great_circle_midpoint(&a, &b).ok()
        })
    }

    /// Point at `fraction` of the way along the great circle.
    ///
    /// The fraction is checked before coordinates are extracted. 0, 1 and
    /// 0.5 return the start, the end and [`midpoint`](Self::midpoint).
    pub fn interpolate(
        &self,
        start: &impl HasCoordinates,
        end: &impl HasCoordinates,
        fraction: f64,
    ) -> GeodesyResult<Option<Coordinate>> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(GeodesyError::InvalidFraction(fraction));
        }

        timed("interpolate", || -> GeodesyResult<Option<Coordinate>> {
            let (Some(a), Some(b)) = (start.get_coordinates(), end.get_coordinates()) else {
                tracing::debug!("Interpolation skipped: missing coordinates");
                return Ok(None);
            };
            if fraction == 0.0 {
                Ok(Some(a))
            } else if fraction == 1.0 {
                Ok(Some(b))
            } else if fraction == 0.5 {
                great_circle_midpoint(&a, &b).map(Some)
            } else {
                slerp(&a, &b, fraction).map(Some)
            }
        })
    }

    /// Bounds enclosing every item with coordinates, `None` if there are none
    pub fn bounding_box<I>(&self, items: I) -> Option<Bounds>
    where
        I: IntoIterator,
        I::Item: HasCoordinates,
    {
        timed("bounding_box", || {
            let coords: Vec<Coordinate> = items
                .into_iter()
                .filter_map(|item| item.get_coordinates())
                .collect();
            Bounds::enclosing(&coords)
        })
    }

    /// Distance from one origin to each target; `None` where a target has no coordinates
    pub fn distances_to_many<I>(
        &self,
        from: &impl HasCoordinates,
        targets: I,
        unit: DistanceUnit,
    ) -> GeodesyResult<Vec<Option<f64>>>
    where
        I: IntoIterator,
        I::Item: HasCoordinates,
    {
        timed("distances_to_many", || {
            let origin = from.get_coordinates();
            targets
                .into_iter()
                .map(|target| -> GeodesyResult<Option<f64>> {
                    match (origin, target.get_coordinates()) {
                        (Some(a), Some(b)) => Ok(Some(unit.from_km(self.strategy.between(&a, &b)?))),
                        _ => Ok(None),
                    }
                })
                .collect()
        })
    }
}

impl Default for GeodesicLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeodesicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeodesicLibrary")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vincenty::Vincenty;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    #[test]
    fn test_distance_units() {
        let lib = GeodesicLibrary::new();
        let a = coord(0.0, 0.0);
        let b = coord(1.0, 0.0);
        let km = lib.distance(&a, &b, DistanceUnit::Kilometers).unwrap().unwrap();
        let m = lib.distance(&a, &b, DistanceUnit::Meters).unwrap().unwrap();
        assert!((km - 111.195).abs() < 0.01, "got {km}");
        assert!((m - km * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_missing_coordinates() {
        let lib = GeodesicLibrary::new();
        let none: Option<Coordinate> = None;
        assert_eq!(lib.distance(&none, &coord(0.0, 0.0), DistanceUnit::Kilometers).unwrap(), None);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let lib = GeodesicLibrary::new();
        let origin = coord(0.0, 0.0);
        assert!((lib.bearing(&origin, &coord(0.0, 1.0)).unwrap() - 0.0).abs() < 1e-9);
        assert!((lib.bearing(&origin, &coord(1.0, 0.0)).unwrap() - 90.0).abs() < 1e-9);
        assert!((lib.bearing(&origin, &coord(0.0, -1.0)).unwrap() - 180.0).abs() < 1e-9);
        assert!((lib.bearing(&origin, &coord(-1.0, 0.0)).unwrap() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_midpoint_across_antimeridian() {
        let mid = great_circle_midpoint(&coord(179.0, 0.0), &coord(-179.0, 0.0)).unwrap();
        assert!((mid.longitude().abs() - 180.0).abs() < 1e-9, "got {mid}");
        assert!(mid.latitude().abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_special_fractions() {
        let lib = GeodesicLibrary::new();
        let a = Coordinate::with_altitude(0.0, 0.0, 25.0).unwrap();
        let b = coord(10.0, 10.0);
        assert_eq!(lib.interpolate(&a, &b, 0.0).unwrap(), Some(a));
        assert_eq!(lib.interpolate(&a, &b, 1.0).unwrap(), Some(b));
        assert_eq!(lib.interpolate(&a, &b, 0.5).unwrap(), lib.midpoint(&a, &b));

        let quarter = lib.interpolate(&a, &b, 0.25).unwrap().unwrap();
        assert!(quarter.longitude() > 0.0 && quarter.longitude() < 5.0);
        assert!(quarter.latitude() > 0.0 && quarter.latitude() < 5.0);
    }

    #[test]
    fn test_interpolate_rejects_fraction_first() {
        let lib = GeodesicLibrary::new();
        let none: Option<Coordinate> = None;
        assert_eq!(
            lib.interpolate(&none, &none, 1.5),
            Err(GeodesyError::InvalidFraction(1.5))
        );
        assert_eq!(lib.interpolate(&none, &none, 0.3), Ok(None));
    }

    #[test]
    fn test_bounding_box_skips_missing() {
        let lib = GeodesicLibrary::new();
        let items = vec![Some(coord(-1.0, -1.0)), None, Some(coord(1.0, 1.0)), Some(coord(0.0, 2.0))];
        let bbox = lib.bounding_box(&items).unwrap();
        assert_eq!(bbox.to_tuple(), (-1.0, -1.0, 1.0, 2.0));

        let empty: Vec<Option<Coordinate>> = vec![None];
        assert!(lib.bounding_box(&empty).is_none());
    }

    #[test]
    fn test_distances_to_many() {
        let lib = GeodesicLibrary::with_strategy(Vincenty::new());
        let targets = vec![Some(coord(1.0, 0.0)), None, Some(coord(0.0, 0.0))];
        let out = lib
            .distances_to_many(&coord(0.0, 0.0), &targets, DistanceUnit::Kilometers)
            .unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[0].unwrap() > 110.0);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(0.0));
    }
}
