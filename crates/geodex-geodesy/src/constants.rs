//! Earth model and numeric constants

/// Mean Earth radius in kilometres (IUGG)
pub const EARTH_RADIUS_MEAN_KM: f64 = 6371.0088;

/// WGS84 semi-major axis in metres
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// WGS84 semi-minor axis in metres
pub const WGS84_B: f64 = 6_356_752.314_245;

/// Coordinates closer than this (degrees) are treated as identical
pub const DEFAULT_COORDINATE_PRECISION: f64 = 1e-6;

/// Default capacity of the distance memo cache
pub const LRU_CACHE_SIZE: usize = 1024;

/// Default Vincenty iteration cap
pub const VINCENTY_MAX_ITERATIONS: u32 = 100;

/// Default Vincenty convergence tolerance
pub const VINCENTY_TOLERANCE: f64 = 1e-12;

/// Below this planar estimate (km) the adaptive strategy keeps the planar result
pub const ADAPTIVE_PLANAR_LIMIT_KM: f64 = 50.0;

/// Below this planar estimate (km) the adaptive strategy uses the sphere
pub const ADAPTIVE_SPHERICAL_LIMIT_KM: f64 = 10_000.0;

/// Operations slower than this (ms) are reported
pub const SLOW_OPERATION_MS: u128 = 100;

/// Half of the mean circumference, the longest great-circle distance
pub fn max_surface_distance_km() -> f64 {
    std::f64::consts::PI * EARTH_RADIUS_MEAN_KM
}
