//! Geodex Core - In-memory query engine over geospatial documents
//!
//! This crate provides the entity model (points, paths, polygons,
//! multi-geometries, placemarks and containers), the field lookup language,
//! chainable query collections and the managers that own each container's
//! children and collect them recursively.

pub mod container;
pub mod criteria;
pub mod document;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod limits;
pub mod lookup;
pub mod manager;
pub mod placemark;
pub mod query;
pub mod traversal;

pub use container::Container;
pub use criteria::Criteria;
pub use document::{Document, DocumentSummary};
pub use entity::{dedup_key, handle, DedupKey, Entity, EntityMeta, Field, Handle};
pub use error::{Error, Result};
pub use geometry::{Geometry, GeometryCounts, MultiGeometry, Path, Point, Polygon};
pub use lookup::{Lookup, Predicate};
pub use manager::{same, Kind, Manager, Scope};
pub use placemark::Placemark;
pub use query::QueryCollection;
pub use traversal::{unwrap_geometries, Collected, CollectionStats, Collector};

pub use geodex_geodesy::{Bounds, Coordinate, HasCoordinates};
