//! Distance units

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeodesyError;

/// Unit a kilometre distance can be expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    Meters,
    #[default]
    Kilometers,
    Miles,
    NauticalMiles,
    Feet,
    Yards,
}

impl DistanceUnit {
    /// Multiplier converting kilometres into this unit
    pub fn per_kilometer(self) -> f64 {
        match self {
            Self::Meters => 1000.0,
            Self::Kilometers => 1.0,
            Self::Miles => 0.621_371,
            Self::NauticalMiles => 0.539_957,
            Self::Feet => 3280.84,
            Self::Yards => 1093.61,
        }
    }

    /// Convert a distance in kilometres
    pub fn from_km(self, km: f64) -> f64 {
        km * self.per_kilometer()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "meters",
            Self::Kilometers => "kilometers",
            Self::Miles => "miles",
            Self::NauticalMiles => "nautical_miles",
            Self::Feet => "feet",
            Self::Yards => "yards",
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = GeodesyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "meters" | "metres" => Ok(Self::Meters),
            "km" | "kilometers" | "kilometres" => Ok(Self::Kilometers),
            "mi" | "miles" => Ok(Self::Miles),
            "nm" | "nmi" | "nautical_miles" => Ok(Self::NauticalMiles),
            "ft" | "feet" => Ok(Self::Feet),
            "yd" | "yards" => Ok(Self::Yards),
            other => Err(GeodesyError::Config(format!("unknown distance unit: {other}"))),
        }
    }
}
