//! Geodesy configuration

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adaptive::Adaptive;
use crate::cache::Cached;
use crate::constants::{LRU_CACHE_SIZE, VINCENTY_MAX_ITERATIONS, VINCENTY_TOLERANCE};
use crate::error::{GeodesyError, GeodesyResult};
use crate::haversine::Haversine;
use crate::library::GeodesicLibrary;
use crate::planar::Planar;
use crate::traits::DistanceStrategy;
use crate::units::DistanceUnit;
use crate::vincenty::Vincenty;

/// Which distance strategy a library should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Haversine,
    Vincenty,
    Planar,
    Adaptive,
}

/// Settings for building a [`GeodesicLibrary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeodesyConfig {
    /// Distance strategy
    pub strategy: StrategyKind,

    /// Let the adaptive strategy use Vincenty for long distances
    pub high_accuracy: bool,

    /// Vincenty iteration cap
    pub max_iterations: u32,

    /// Vincenty convergence tolerance (radians)
    pub tolerance: f64,

    /// Memo cache entries for Vincenty-backed strategies (0 disables)
    pub cache_capacity: usize,

    /// Unit used by callers that do not pass one
    pub unit: DistanceUnit,
}

impl Default for GeodesyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            high_accuracy: false,
            max_iterations: VINCENTY_MAX_ITERATIONS,
            tolerance: VINCENTY_TOLERANCE,
            cache_capacity: LRU_CACHE_SIZE,
            unit: DistanceUnit::default(),
        }
    }
}

impl GeodesyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(input: &str) -> GeodesyResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> GeodesyResult<String> {
        toml::to_string_pretty(self).map_err(|e| GeodesyError::Config(e.to_string()))
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn validate(&self) -> GeodesyResult<()> {
        if self.max_iterations == 0 {
            return Err(GeodesyError::Config("max_iterations must be at least 1".to_string()));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(GeodesyError::Config(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    fn vincenty(&self) -> Vincenty {
        Vincenty::new()
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
    }

    /// Build the configured strategy.
    ///
    /// Only strategies that may run Vincenty are wrapped in the memo cache.
    pub fn strategy(&self) -> GeodesyResult<Arc<dyn DistanceStrategy>> {
        self.validate()?;
        let cache = self.cache_capacity;
        let strategy: Arc<dyn DistanceStrategy> = match self.strategy {
            StrategyKind::Haversine => Arc::new(Haversine::new()),
            StrategyKind::Planar => Arc::new(Planar::new()),
            StrategyKind::Vincenty if cache > 0 => {
                Arc::new(Cached::with_capacity(self.vincenty(), cache))
            }
            StrategyKind::Vincenty => Arc::new(self.vincenty()),
            StrategyKind::Adaptive => {
                let adaptive = Adaptive::new(self.high_accuracy).with_vincenty(self.vincenty());
                if self.high_accuracy && cache > 0 {
                    Arc::new(Cached::with_capacity(adaptive, cache))
                } else {
                    Arc::new(adaptive)
                }
            }
        };
        tracing::debug!(
            "Built {} distance strategy (cache capacity {})",
            strategy.name(),
            cache
        );
        Ok(strategy)
    }

    pub fn build(&self) -> GeodesyResult<GeodesicLibrary> {
        Ok(GeodesicLibrary::from_shared(self.strategy()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeodesyConfig::default();
        assert_eq!(config.strategy, StrategyKind::Haversine);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.build().unwrap().strategy().name(), "haversine");
    }

    #[test]
    fn test_from_toml() {
        let config = GeodesyConfig::from_toml_str(
            r#"
            strategy = "adaptive"
            high_accuracy = true
            unit = "nautical_miles"
            "#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyKind::Adaptive);
        assert!(config.high_accuracy);
        assert_eq!(config.unit, DistanceUnit::NauticalMiles);
        assert_eq!(config.tolerance, 1e-12);
        assert_eq!(config.build().unwrap().strategy().name(), "adaptive");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(GeodesyConfig::from_toml_str("strategy = \"teleport\"").is_err());
        assert!(GeodesyConfig::from_toml_str("max_iterations = 0").is_err());
        assert!(GeodesyConfig::from_toml_str("tolerance = -1.0").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GeodesyConfig::new()
            .with_strategy(StrategyKind::Vincenty)
            .with_cache_capacity(0);
        let text = config.to_toml_string().unwrap();
        assert_eq!(GeodesyConfig::from_toml_str(&text).unwrap(), config);
    }
}
