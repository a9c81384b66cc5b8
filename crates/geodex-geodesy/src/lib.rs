//! Geodex Geodesy - Coordinates and geodesic calculations
//!
//! Provides validated coordinates, the coordinate extraction trait, a set of
//! interchangeable distance strategies and the geodesic primitive library
//! (distance, bearing, midpoint, interpolation, bounding boxes).

pub mod adaptive;
pub mod bounds;
pub mod cache;
pub mod config;
pub mod constants;
pub mod coordinate;
pub mod error;
pub mod haversine;
pub mod library;
pub mod planar;
pub mod traits;
pub mod units;
pub mod vincenty;

pub use adaptive::Adaptive;
pub use bounds::Bounds;
pub use cache::{CacheStats, Cached};
pub use config::{GeodesyConfig, StrategyKind};
pub use coordinate::{coerce_coordinate, Coordinate, HasCoordinates};
pub use error::{GeodesyError, GeodesyResult};
pub use haversine::{haversine_km, Haversine};
pub use library::{great_circle_midpoint, initial_bearing, GeodesicLibrary};
pub use planar::Planar;
pub use traits::DistanceStrategy;
pub use units::DistanceUnit;
pub use vincenty::Vincenty;
