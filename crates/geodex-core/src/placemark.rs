//! Placemarks: features that carry a geometry and descriptive data

use geodex_geodesy::{Coordinate, HasCoordinates};
use serde_json::{Map, Value};

use crate::entity::{
    coordinate_value, opt_f64, opt_str, string_value, Entity, EntityMeta, Field, Handle,
};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, MultiGeometry, Point};

/// A feature with an optional geometry and an optional aggregate.
///
/// The coordinate accessors read through the embedded point; a placemark
/// whose geometry is not a point has no coordinates of its own.
#[derive(Debug, Clone, Default)]
pub struct Placemark {
    pub meta: EntityMeta,
    pub geometry: Option<Geometry>,
    pub multigeometry: Option<Handle<MultiGeometry>>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub snippet: Option<String>,
    pub style_url: Option<String>,
    pub extended_data: Map<String, Value>,
}

impl Placemark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            meta: EntityMeta::new().with_name(name),
            ..Self::default()
        }
    }

    /// Placemark with an embedded point at `(lon, lat)`
    pub fn at(longitude: f64, latitude: f64) -> Result<Self> {
        Ok(Self::default().with_geometry(Point::at(longitude, latitude)?))
    }

    pub fn with_geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    pub fn with_multigeometry(mut self, multi: impl Into<Handle<MultiGeometry>>) -> Self {
        self.multigeometry = Some(multi.into());
        self
    }

    /// The embedded point, if the geometry is one
    pub fn point(&self) -> Option<Handle<Point>> {
        match &self.geometry {
            Some(Geometry::Point(point)) => Some(point.clone()),
            _ => None,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinate> {
        let point = self.point()?;
        let coordinates = point.try_borrow().ok()?.coordinates();
        coordinates
    }

    /// Create the embedded point or move the existing one
    pub fn set_coordinates(&mut self, coordinate: Coordinate) -> Result<()> {
        if let Some(point) = self.point() {
            let mut point = point.try_borrow_mut().map_err(|_| {
                Error::validation("coordinates", "the embedded point is borrowed elsewhere")
            })?;
            point.set_coordinates(Some(coordinate));
            return Ok(());
        }
        if let Some(geometry) = &self.geometry {
            return Err(Error::validation(
                "coordinates",
                format!("placemark geometry is a {}, not a Point", geometry.kind()),
            ));
        }
        self.geometry = Some(Point::from_coordinate(coordinate).into());
        Ok(())
    }

    /// Permissive form of [`set_coordinates`](Self::set_coordinates); `null` drops the point
    pub fn set_coordinates_from(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            if self.point().is_some() {
                self.geometry = None;
            }
            return Ok(());
        }
        self.set_coordinates(coordinate_value("coordinates", value)?)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.longitude())
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.latitude())
    }

    pub fn altitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.altitude())
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates().is_some()
    }

    /// Great-circle distance in kilometres
    pub fn distance_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        self.coordinates()?.distance_to(other)
    }

    pub fn bearing_to(&self, other: &impl HasCoordinates) -> Option<f64> {
        self.coordinates()?.bearing_to(other)
    }

    pub fn midpoint_to(&self, other: &impl HasCoordinates) -> Option<Coordinate> {
        self.coordinates()?.midpoint_to(other)
    }
}

impl HasCoordinates for Placemark {
    fn get_coordinates(&self) -> Option<Coordinate> {
        self.coordinates()
    }
}

fn dump<T: Entity>(entity: &Handle<T>) -> Value {
    entity
        .try_borrow()
        .map_or(Value::Null, |e| Value::Object(e.to_field_map()))
}

static PLACEMARK_FIELDS: &[Field<Placemark>] = &[
    Field::writable(
        "coordinates",
        |p: &Placemark| p.coordinates().map_or(Value::Null, |c| c.to_value()),
        |p: &mut Placemark, v: Value| p.set_coordinates_from(&v),
    ),
    Field::read_only("longitude", |p: &Placemark| opt_f64(p.longitude())),
    Field::read_only("latitude", |p: &Placemark| opt_f64(p.latitude())),
    Field::read_only("altitude", |p: &Placemark| opt_f64(p.altitude())),
    Field::read_only("has_coordinates", |p: &Placemark| {
        Value::Bool(p.has_coordinates())
    }),
    Field::read_only("point", |p: &Placemark| {
        p.point().map_or(Value::Null, |point| dump(&point))
    }),
    Field::read_only("geometry", |p: &Placemark| {
        p.geometry.as_ref().map_or(Value::Null, Geometry::summary)
    }),
    Field::read_only("multigeometry", |p: &Placemark| {
        p.multigeometry.as_ref().map_or(Value::Null, dump)
    }),
    Field::writable(
        "address",
        |p: &Placemark| opt_str(&p.address),
        |p: &mut Placemark, v: Value| -> Result<()> {
            p.address = string_value("address", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "phone_number",
        |p: &Placemark| opt_str(&p.phone_number),
        |p: &mut Placemark, v: Value| -> Result<()> {
            p.phone_number = string_value("phone_number", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "snippet",
        |p: &Placemark| opt_str(&p.snippet),
        |p: &mut Placemark, v: Value| -> Result<()> {
            p.snippet = string_value("snippet", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "style_url",
        |p: &Placemark| opt_str(&p.style_url),
        |p: &mut Placemark, v: Value| -> Result<()> {
            p.style_url = string_value("style_url", v)?;
            Ok(())
        },
    ),
    Field::writable(
        "extended_data",
        |p: &Placemark| Value::Object(p.extended_data.clone()),
        |p: &mut Placemark, v: Value| -> Result<()> {
            p.extended_data = match v {
                Value::Null => Map::new(),
                Value::Object(map) => map,
                other => {
                    return Err(Error::validation(
                        "extended_data",
                        format!("expected an object, got {other}"),
                    ))
                }
            };
            Ok(())
        },
    ),
];

impl Entity for Placemark {
    const KIND: &'static str = "Placemark";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn fields() -> &'static [Field<Self>] {
        PLACEMARK_FIELDS
    }
}
