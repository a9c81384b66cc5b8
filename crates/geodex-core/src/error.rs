//! Error types for Geodex Core

use geodex_geodesy::GeodesyError;
use thiserror::Error;

use crate::criteria::Criteria;
use crate::limits::LimitError;

/// Result type alias using Geodex's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Geodex error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A coordinate or field value was rejected on construction or assignment
    #[error("Validation error{}: {message}", field_suffix(.field))]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{kind} matching query ({criteria}) does not exist")]
    NotFound {
        kind: &'static str,
        criteria: Criteria,
    },

    #[error("get() returned more than one {kind} -- it returned {count}! Lookup was: {criteria}")]
    MultipleReturned {
        kind: &'static str,
        count: usize,
        criteria: Criteria,
    },

    /// The query itself is malformed (unknown lookup, bad operand, bad sort field)
    #[error("Query error{}: {message}", field_suffix(.field))]
    Query {
        field: Option<String>,
        message: String,
    },

    #[error("Geodesy error: {0}")]
    Geodesy(GeodesyError),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" on '{name}'"),
        None => String::new(),
    }
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            field: None,
            message: message.into(),
        }
    }

    pub fn query_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_multiple_returned(&self) -> bool {
        matches!(self, Self::MultipleReturned { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}

/// Coordinate failures are validation errors; everything else stays geodesic
impl From<GeodesyError> for Error {
    fn from(err: GeodesyError) -> Self {
        match err {
            GeodesyError::InvalidCoordinate(message) => Self::Validation {
                field: Some("coordinates".to_string()),
                message,
            },
            other => Self::Geodesy(other),
        }
    }
}

impl From<LimitError> for Error {
    fn from(err: LimitError) -> Self {
        Self::query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let criteria = Criteria::from([("name", "Store")]);
        let not_found = Error::NotFound {
            kind: "Placemark",
            criteria: criteria.clone(),
        };
        assert_eq!(
            not_found.to_string(),
            "Placemark matching query (name=\"Store\") does not exist"
        );

        let multiple = Error::MultipleReturned {
            kind: "Placemark",
            count: 3,
            criteria,
        };
        assert!(multiple.to_string().contains("it returned 3!"));

        let query = Error::query_field("name__nope", "unknown lookup 'nope'");
        assert_eq!(query.to_string(), "Query error on 'name__nope': unknown lookup 'nope'");
    }

    #[test]
    fn test_coordinate_errors_become_validation() {
        let err: Error = GeodesyError::InvalidCoordinate("latitude 95 out of range".into()).into();
        assert!(err.is_validation());

        let err: Error = GeodesyError::InvalidFraction(2.0).into();
        assert!(matches!(err, Error::Geodesy(_)));
    }
}
