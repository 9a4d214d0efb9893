//! Per-call options and engine-level settings.

use crate::error::ConfigurationError;
use crate::region::Region;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-9;
pub const DEFAULT_SYMBOLIC_TIMEOUT_MS: i64 = 2_000;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Options for one equivalence check. Part of the cache fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquivalenceConfig {
    pub region: Region,
    /// Skip canonicalization and go straight to the symbolic fallback.
    pub force_symbolic_only: bool,
    /// Largest absolute residue still treated as zero when the difference
    /// evaluates to a plain number.
    pub float_tolerance: f64,
    /// Budget for the symbolic fallback. Signed so that a negative value in a
    /// config file is reported instead of wrapping.
    pub symbolic_timeout_ms: i64,
    pub max_canonicalization_iterations: usize,
    pub cache_enabled: bool,
}

impl Default for EquivalenceConfig {
    fn default() -> Self {
        Self {
            region: Region::Standard,
            force_symbolic_only: false,
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            symbolic_timeout_ms: DEFAULT_SYMBOLIC_TIMEOUT_MS,
            max_canonicalization_iterations: DEFAULT_MAX_ITERATIONS,
            cache_enabled: true,
        }
    }
}

impl EquivalenceConfig {
    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.symbolic_timeout_ms < 0 {
            return Err(ConfigurationError::NegativeTimeout(self.symbolic_timeout_ms));
        }
        if self.max_canonicalization_iterations == 0 {
            return Err(ConfigurationError::ZeroIterationCap);
        }
        if !self.float_tolerance.is_finite() || self.float_tolerance < 0.0 {
            return Err(ConfigurationError::InvalidTolerance(self.float_tolerance));
        }
        Ok(())
    }

    /// Timeout as a duration. Call after [`validate`](Self::validate).
    pub fn symbolic_timeout(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.symbolic_timeout_ms).unwrap_or(0))
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Settings file layout:
///
/// ```toml
/// [check]
/// region = "continental"
/// symbolic_timeout_ms = 1500
///
/// [cache]
/// ttl_secs = 3600
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub check: EquivalenceConfig,
    pub cache: CacheSettings,
}

impl EngineSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let settings: EngineSettings =
            toml::from_str(content).map_err(|e| ConfigurationError::Load(e.to_string()))?;
        settings.check.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::Load(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EquivalenceConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.symbolic_timeout(), Duration::from_millis(2000));
        assert_eq!(config.float_tolerance, 1e-9);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let config = EquivalenceConfig {
            symbolic_timeout_ms: -1,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::NegativeTimeout(-1))
        );

        let config = EquivalenceConfig {
            max_canonicalization_iterations: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigurationError::ZeroIterationCap));

        for tol in [-1e-3, f64::NAN, f64::INFINITY] {
            let config = EquivalenceConfig {
                float_tolerance: tol,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::InvalidTolerance(_))
            ));
        }
    }

    #[test]
    fn test_settings_from_toml_fill_defaults() {
        let settings = EngineSettings::from_toml_str(
            "[check]\nregion = \"continental\"\nsymbolic_timeout_ms = 1500\n",
        )
        .unwrap();
        assert_eq!(settings.check.region, Region::Continental);
        assert_eq!(settings.check.symbolic_timeout_ms, 1500);
        assert!(settings.check.cache_enabled);
        assert_eq!(settings.cache.ttl_secs, DEFAULT_CACHE_TTL_SECS);
    }

    #[test]
    fn test_settings_from_toml_validates() {
        let err = EngineSettings::from_toml_str("[check]\nsymbolic_timeout_ms = -5\n").unwrap_err();
        assert_eq!(err, ConfigurationError::NegativeTimeout(-5));
        assert!(matches!(
            EngineSettings::from_toml_str("[check\n"),
            Err(ConfigurationError::Load(_))
        ));
    }

    #[test]
    fn test_settings_toml_round_trip() {
        let settings = EngineSettings::default();
        let text = settings.to_toml_string().unwrap();
        assert_eq!(EngineSettings::from_toml_str(&text).unwrap(), settings);
    }
}
