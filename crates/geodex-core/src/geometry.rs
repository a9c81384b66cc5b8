//! Geometry entities: points, paths, polygons and multi-geometry aggregates

use geodex_geodesy::{haversine_km, Bounds, Coordinate, HasCoordinates};
use serde::Serialize;
use serde_json::{json, Value};

use crate::entity::{
    bool_value, coordinate_list, coordinate_list_value, handle, opt_f64, opt_str, probe_coordinates,
    string_value, Entity, EntityMeta, Field, Handle,
};
use crate::error::{Error, Result};
use crate::traversal::unwrap_geometries;

/// A single position
#[derive(Debug, Clone, Default)]
pub struct Point {
    pub meta: EntityMeta,
    coordinates: Option<Coordinate>,
    pub extrude: bool,
    pub tessellate: bool,
    pub altitude_mode: Option<String>,
}

impl Point {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at `(lon, lat)`; out-of-range values are a validation error
    pub fn at(longitude: f64, latitude: f64) -> Result<Self> {
        Ok(Self::from_coordinate(Coordinate::new(longitude, latitude)?))
    }

    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self {
            coordinates: Some(coordinate),
            ..Self::default()
        }
    }

    pub fn coordinates(&self) -> Option<Coordinate> {
        self.coordinates
    }

    pub fn set_coordinates(&mut self, coordinates: Option<Coordinate>) {
        self.coordinates = coordinates;
    }

    /// Permissive assignment from tuples, arrays, strings or objects; `null` clears
    pub fn set_coordinates_from(&mut self, value: &Value) -> Result<()> {
        self.coordinates = match value {
            Value::Null => None,
            other => Some(Coordinate::try_from(other)?),
        };
        Ok(())
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude())
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude())
    }

    pub fn altitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.altitude())
    }

    /// Great-circle distance in kilometres
    pub fn distance_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        self.coordinates?.distance_to(other)
    }

    pub fn bearing_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        self.coordinates?.bearing_to(other)
    }

    pub fn midpoint_to(&self, other: &impl HasCoordinates) -> Option<Coordinate> {
        self.coordinates?.midpoint_to(other)
    }
}

impl HasCoordinates for Point {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.coordinates
    }
}

static POINT_FIELDS: &[Field<Point>] = &[
    Field::writable(
        "coordinates",
        |p: &Point| p.coordinates.map_or(Value::Null, |c| c.to_value()),
        |p: &mut Point, v: Value| p.set_coordinates_from(&v),
    ),
    Field::read_only("longitude", |p: &Point| opt_f64(p.longitude())),
    Field::read_only("latitude", |p: &Point| opt_f64(p.latitude())),
    Field::read_only("altitude", |p: &Point| opt_f64(p.altitude())),
    Field::read_only("has_coordinates", |p: &Point| Value::Bool(p.has_coordinates())),
    Field::writable(
        "extrude",
        |p: &Point| Value::Bool(p.extrude),
        |p: &mut Point, v: Value| -> Result<()> {
            p.extrude = bool_value("extrude", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "tessellate",
        |p: &Point| Value::Bool(p.tessellate),
        |p: &mut Point, v: Value| -> Result<()> {
            p.tessellate = bool_value("tessellate", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "altitude_mode",
        |p: &Point| opt_str(&p.altitude_mode),
        |p: &mut Point, v: Value| -> Result<()> {
            p.altitude_mode = string_value("altitude_mode", v)?;
            Ok(())
        },
    ),
];

impl Entity for Point {
    const KIND: &'static str = "Point";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        POINT_FIELDS
    }
}

/// A line string
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub meta: EntityMeta,
    coordinates: Vec<Coordinate>,
    pub extrude: bool,
    pub tessellate: bool,
    pub altitude_mode: Option<String>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_coordinates(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            ..Self::default()
        }
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn set_coordinates(&mut self, coordinates: Vec<Coordinate>) {
        self.coordinates = coordinates;
    }

    pub fn push(&mut self, coordinate: Coordinate) {
        self.coordinates.push(coordinate);
    }

    pub fn point_count(&self) -> usize {
        self.coordinates.len()
    }

    /// Sum of the great-circle legs in kilometres
    pub fn length_km(&self) -> f64 {
        self.coordinates
            .windows(2)
            .map(|leg| haversine_km(&leg[0], &leg[1]))
            .sum()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::enclosing(&self.coordinates)
    }
}

impl HasCoordinates for Path {
    fn get_coordinates(&self) -> Option<Coordinate> {
        probe_coordinates(self)
    }
}

static PATH_FIELDS: &[Field<Path>] = &[
    Field::writable(
        "coordinates",
        |p: &Path| coordinate_list_value(&p.coordinates),
        |p: &mut Path, v: Value| -> Result<()> {
            p.coordinates = coordinate_list("coordinates", v)?;
            Ok(())
        },
    ),
    Field::read_only("point_count", |p: &Path| Value::from(p.point_count())),
    Field::read_only("length_km", |p: &Path| Value::from(p.length_km())),
    Field::writable(
        "extrude",
        |p: &Path| Value::Bool(p.extrude),
        |p: &mut Path, v: Value| -> Result<()> {
            p.extrude = bool_value("extrude", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "tessellate",
        |p: &Path| Value::Bool(p.tessellate),
        |p: &mut Path, v: Value| -> Result<()> {
            p.tessellate = bool_value("tessellate", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "altitude_mode",
        |p: &Path| opt_str(&p.altitude_mode),
        |p: &mut Path, v: Value| -> Result<()> {
            p.altitude_mode = string_value("altitude_mode", v)?;
            Ok(())
        },
    ),
];

impl Entity for Path {
    const KIND: &'static str = "Path";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        PATH_FIELDS
    }

    fn validate(&self) -> Result<()> {
        if self.coordinates.len() == 1 {
            return Err(Error::validation(
                "coordinates",
                "a path needs at least 2 points",
            ));
        }
        Ok(())
    }
}

/// An area with an outer ring and optional holes
#[derive(Debug, Clone, Default)]
pub struct Polygon {
    pub meta: EntityMeta,
    outer_boundary: Vec<Coordinate>,
    inner_boundaries: Vec<Vec<Coordinate>>,
    pub extrude: bool,
    pub tessellate: bool,
    pub altitude_mode: Option<String>,
}

/// Fewest vertices a closed ring can have
pub const MIN_RING_POINTS: usize = 4;

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_boundary(outer_boundary: Vec<Coordinate>) -> Self {
        Self {
            outer_boundary,
            ..Self::default()
        }
    }

    pub fn outer_boundary(&self) -> &[Coordinate] {
        &self.outer_boundary
    }

    pub fn inner_boundaries(&self) -> &[Vec<Coordinate>] {
        &self.inner_boundaries
    }

    pub fn set_outer_boundary(&mut self, ring: Vec<Coordinate>) {
        self.outer_boundary = ring;
    }

    pub fn add_inner_boundary(&mut self, ring: Vec<Coordinate>) {
        self.inner_boundaries.push(ring);
    }

    pub fn boundary_point_count(&self) -> usize {
        self.outer_boundary.len()
    }

    pub fn hole_count(&self) -> usize {
        self.inner_boundaries.len()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::enclosing(&self.outer_boundary)
    }
}

fn check_ring(field: &str, ring: &[Coordinate]) -> Result<()> {
    if !ring.is_empty() && ring.len() < MIN_RING_POINTS {
        return Err(Error::validation(
            field,
            format!(
                "a ring needs at least {MIN_RING_POINTS} points, got {}",
                ring.len()
            ),
        ));
    }
    Ok(())
}

impl HasCoordinates for Polygon {
    fn get_coordinates(&self) -> Option<Coordinate> {
        probe_coordinates(self)
    }
}

static POLYGON_FIELDS: &[Field<Polygon>] = &[
    Field::writable(
        "outer_boundary",
        |p: &Polygon| coordinate_list_value(&p.outer_boundary),
        |p: &mut Polygon, v: Value| -> Result<()> {
            p.outer_boundary = coordinate_list("outer_boundary", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "inner_boundaries",
        |p: &Polygon| {
            Value::Array(
                p.inner_boundaries
                    .iter()
                    .map(|ring| coordinate_list_value(ring))
                    .collect(),
            )
        },
        |p: &mut Polygon, v: Value| -> Result<()> {
            p.inner_boundaries = match v {
                Value::Null => Vec::new(),
                Value::Array(rings) => rings
                    .into_iter()
                    .map(|ring| coordinate_list("inner_boundaries", ring))
                    .collect::<Result<_>>()?,
                other => {
                    return Err(Error::validation(
                        "inner_boundaries",
                        format!("expected a list of rings, got {other}"),
                    ))
                }
            };
            Ok(())
        },
    ),
    Field::read_only("coordinates", |p: &Polygon| {
        coordinate_list_value(&p.outer_boundary)
    }),
    Field::read_only("boundary_point_count", |p: &Polygon| {
        Value::from(p.boundary_point_count())
    }),
    Field::read_only("hole_count", |p: &Polygon| Value::from(p.hole_count())),
    Field::writable(
        "extrude",
        |p: &Polygon| Value::Bool(p.extrude),
        |p: &mut Polygon, v: Value| -> Result<()> {
            p.extrude = bool_value("extrude", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "tessellate",
        |p: &Polygon| Value::Bool(p.tessellate),
        |p: &mut Polygon, v: Value| -> Result<()> {
            p.tessellate = bool_value("tessellate", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "altitude_mode",
        |p: &Polygon| opt_str(&p.altitude_mode),
        |p: &mut Polygon, v: Value| -> Result<()> {
            p.altitude_mode = string_value("altitude_mode", v)?;
            Ok(())
        },
    ),
];

impl Entity for Polygon {
    const KIND: &'static str = "Polygon";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        POLYGON_FIELDS
    }

    fn validate(&self) -> Result<()> {
        check_ring("outer_boundary", &self.outer_boundary)?;
        for ring in &self.inner_boundaries {
            check_ring("inner_boundaries", ring)?;
        }
        Ok(())
    }
}

/// Any geometry a placemark or aggregate can hold
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(Handle<Point>),
    Path(Handle<Path>),
    Polygon(Handle<Polygon>),
    Multi(Handle<MultiGeometry>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => Point::KIND,
            Self::Path(_) => Path::KIND,
            Self::Polygon(_) => Polygon::KIND,
            Self::Multi(_) => MultiGeometry::KIND,
        }
    }

    /// `{kind, id, name}`; a geometry that is mutably borrowed reports only its kind
    pub fn summary(&self) -> Value {
        let meta = match self {
            Self::Point(h) => h.try_borrow().ok().map(|g| g.meta.clone()),
            Self::Path(h) => h.try_borrow().ok().map(|g| g.meta.clone()),
            Self::Polygon(h) => h.try_borrow().ok().map(|g| g.meta.clone()),
            Self::Multi(h) => h.try_borrow().ok().map(|g| g.meta.clone()),
        };
        match meta {
            Some(meta) => json!({"kind": self.kind(), "id": meta.id, "name": meta.name}),
            None => json!({"kind": self.kind()}),
        }
    }
}

impl From<Point> for Geometry {
    fn from(point: Point) -> Self {
        Self::Point(handle(point))
    }
}

impl From<Path> for Geometry {
    fn from(path: Path) -> Self {
        Self::Path(handle(path))
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Self::Polygon(handle(polygon))
    }
}

impl From<MultiGeometry> for Geometry {
    fn from(multi: MultiGeometry) -> Self {
        Self::Multi(handle(multi))
    }
}

impl From<Handle<Point>> for Geometry {
    fn from(point: Handle<Point>) -> Self {
        Self::Point(point)
    }
}

impl From<Handle<Path>> for Geometry {
    fn from(path: Handle<Path>) -> Self {
        Self::Path(path)
    }
}

impl From<Handle<Polygon>> for Geometry {
    fn from(polygon: Handle<Polygon>) -> Self {
        Self::Polygon(polygon)
    }
}

impl From<Handle<MultiGeometry>> for Geometry {
    fn from(multi: Handle<MultiGeometry>) -> Self {
        Self::Multi(multi)
    }
}

/// Leaf counts across every nesting level of an aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeometryCounts {
    pub points: usize,
    pub paths: usize,
    pub polygons: usize,
    pub multigeometries: usize,
}

/// An aggregate of geometries, possibly nested
#[derive(Debug, Clone, Default)]
pub struct MultiGeometry {
    pub meta: EntityMeta,
    geometries: Vec<Geometry>,
}

impl MultiGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: impl Into<Geometry>) {
        self.geometries.push(geometry.into());
    }

    /// Direct members only
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Every point at any depth
    pub fn points(&self) -> Vec<Handle<Point>> {
        unwrap_geometries(self.geometries.iter().cloned())
    }

    pub fn paths(&self) -> Vec<Handle<Path>> {
        unwrap_geometries(self.geometries.iter().cloned())
    }

    pub fn polygons(&self) -> Vec<Handle<Polygon>> {
        unwrap_geometries(self.geometries.iter().cloned())
    }

    /// Nested aggregates at any depth
    pub fn multigeometries(&self) -> Vec<Handle<MultiGeometry>> {
        unwrap_geometries(self.geometries.iter().cloned())
    }

    pub fn geometry_counts(&self) -> GeometryCounts {
        GeometryCounts {
            points: self.points().len(),
            paths: self.paths().len(),
            polygons: self.polygons().len(),
            multigeometries: self.multigeometries().len(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut coords: Vec<Coordinate> = self
            .points()
            .iter()
            .filter_map(|p| p.get_coordinates())
            .collect();
        for path in self.paths() {
            if let Ok(path) = path.try_borrow() {
                coords.extend_from_slice(path.coordinates());
            }
        }
        for polygon in self.polygons() {
            if let Ok(polygon) = polygon.try_borrow() {
                coords.extend_from_slice(polygon.outer_boundary());
            }
        }
        Bounds::enclosing(&coords)
    }
}

static MULTIGEOMETRY_FIELDS: &[Field<MultiGeometry>] = &[
    Field::read_only("geometries", |m: &MultiGeometry| {
        Value::Array(m.geometries.iter().map(Geometry::summary).collect())
    }),
    Field::read_only("geometry_count", |m: &MultiGeometry| {
        Value::from(m.geometry_count())
    }),
    Field::read_only("point_count", |m: &MultiGeometry| Value::from(m.points().len())),
    Field::read_only("path_count", |m: &MultiGeometry| Value::from(m.paths().len())),
    Field::read_only("polygon_count", |m: &MultiGeometry| {
        Value::from(m.polygons().len())
    }),
    Field::read_only("multigeometry_count", |m: &MultiGeometry| {
        Value::from(m.multigeometries().len())
    }),
];

impl Entity for MultiGeometry {
    const KIND: &'static str = "MultiGeometry";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        MULTIGEOMETRY_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    #[test]
    fn test_point_construction() {
        let point = Point::at(-105.0, 39.7).unwrap();
        assert_eq!(point.longitude(), Some(-105.0));
        assert_eq!(point.altitude(), Some(0.0));

        let err = Point::at(200.0, 0.0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_point_permissive_setter() {
        let mut point = Point::new();
        point.set_field("coordinates", json!("-105.1,39.2,1600")).unwrap();
        assert_eq!(point.altitude(), Some(1600.0));

        point
            .set_field("coordinates", json!({"longitude": 1.0, "latitude": 2.0}))
            .unwrap();
        assert_eq!(point.latitude(), Some(2.0));

        assert!(point.set_field("coordinates", json!([1.0, 91.0])).is_err());
        assert!(point.set_field("coordinates", json!("abc")).is_err());

        point.set_field("coordinates", Value::Null).unwrap();
        assert!(!point.has_coordinates());
    }

    #[test]
    fn test_point_geodesy() {
        let denver = Point::at(-104.9903, 39.7392).unwrap();
        let boulder = Point::at(-105.2705, 40.0150).unwrap();
        let d = denver.distance_to(&boulder).unwrap();
        assert!((d - 39.0).abs() < 1.0, "got {d}");
        assert!(denver.bearing_to(&boulder).is_some());
        assert!(Point::new().distance_to(&boulder).is_none());
    }

    #[test]
    fn test_path() {
        let mut path = Path::from_coordinates(vec![coord(0.0, 0.0), coord(1.0, 0.0)]);
        assert_eq!(path.point_count(), 2);
        assert!((path.length_km() - 111.19).abs() < 0.1);
        assert_eq!(path.get_coordinates(), Some(coord(0.0, 0.0)));
        assert!(path.validate().is_ok());

        path.set_field("coordinates", json!([[5.0, 5.0]])).unwrap();
        assert!(path.validate().is_err());
        assert!(path.set_field("coordinates", json!([[5.0, 95.0]])).is_err());
        assert!(Path::new().get_coordinates().is_none());
    }

    #[test]
    fn test_polygon_rings() {
        let ring = vec![coord(0.0, 0.0), coord(1.0, 0.0), coord(1.0, 1.0), coord(0.0, 0.0)];
        let mut polygon = Polygon::from_boundary(ring);
        assert!(polygon.validate().is_ok());
        assert_eq!(polygon.resolve_field("boundary_point_count"), Some(json!(4)));

        polygon.add_inner_boundary(vec![coord(0.1, 0.1), coord(0.2, 0.1)]);
        assert_eq!(polygon.hole_count(), 1);
        assert!(polygon.validate().is_err());

        polygon.set_field("inner_boundaries", json!([])).unwrap();
        assert!(polygon.validate().is_ok());
        assert!(polygon.set_field("coordinates", json!([])).is_err());
    }

    #[test]
    fn test_multigeometry_flattens_nested() {
        let mut inner = MultiGeometry::new();
        inner.add_geometry(Point::at(1.0, 1.0).unwrap());
        inner.add_geometry(Path::from_coordinates(vec![coord(0.0, 0.0), coord(1.0, 1.0)]));

        let mut outer = MultiGeometry::new();
        outer.add_geometry(Point::at(2.0, 2.0).unwrap());
        outer.add_geometry(inner);

        let counts = outer.geometry_counts();
        assert_eq!(
            counts,
            GeometryCounts {
                points: 2,
                paths: 1,
                polygons: 0,
                multigeometries: 1
            }
        );
        assert_eq!(outer.geometry_count(), 2);
        assert_eq!(outer.resolve_field("point_count"), Some(json!(2)));

        let bounds = outer.bounds().unwrap();
        assert_eq!(bounds.north, 2.0);
        assert_eq!(bounds.south, 0.0);
    }

    #[test]
    fn test_multigeometry_cycle_terminates() {
        let a = handle(MultiGeometry::new());
        let b = handle(MultiGeometry::new());
        a.borrow_mut().add_geometry(b.clone());
        b.borrow_mut().add_geometry(a.clone());
        b.borrow_mut().add_geometry(Point::at(0.0, 0.0).unwrap());

        let points = a.borrow().points();
        assert_eq!(points.len(), 1);
        // break the cycle so the test does not leak
        b.borrow_mut().geometries.clear();
    }
}
