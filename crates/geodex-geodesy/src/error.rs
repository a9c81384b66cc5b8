//! Geodesy error types

use thiserror::Error;

/// Result type alias for geodesic operations
pub type GeodesyResult<T> = std::result::Result<T, GeodesyError>;

/// Geodesy-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeodesyError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Interpolation fraction must be between 0 and 1, got {0}")]
    InvalidFraction(f64),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calculation error: {0}")]
    Calculation(String),
}

impl From<toml::de::Error> for GeodesyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
