//! Policy configuration for detectors and diagnosers.
//!
//! Options are keyed `<ComponentName>.<optionName>`, for example
//! `BackPressureDetector.noiseFilterThreshold`. Values come from an optional
//! policy file (any format the `config` crate understands) overridden by
//! `HEALTHMGR_`-prefixed environment variables using `__` as the path
//! separator, e.g. `HEALTHMGR_SLOWINSTANCEDIAGNOSER__LIMIT=10`.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use tracing::warn;

pub const NOISE_FILTER_THRESHOLD: &str = "BackPressureDetector.noiseFilterThreshold";
pub const DISPARITY_RATIO: &str = "LoadDisparityDetector.disparityRatio";
pub const SLOW_INSTANCE_LIMIT: &str = "SlowInstanceDiagnoser.limit";
pub const SLOW_INSTANCE_PROXIMITY: &str = "SlowInstanceDiagnoser.proximityFactor";
pub const DATA_SKEW_LIMIT: &str = "DataSkewDiagnoser.limit";
pub const DATA_SKEW_PROXIMITY: &str = "DataSkewDiagnoser.proximityFactor";
pub const BALANCE_RATIO: &str = "UnderProvisioningDiagnoser.balanceRatio";

/// Read-only view over the health policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    config: Config,
}

impl PolicyConfig {
    /// Load the policy from an optional file plus environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, Environment::with_prefix("HEALTHMGR").separator("__"))
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder.add_source(env).build()?;
        Ok(Self { config })
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Numeric option `key`, or `default` when absent or invalid.
    ///
    /// Environment sources lowercase their keys while file keys keep their
    /// case, so the lowercase form of `key` is consulted first and the exact
    /// key second. Negative and non-finite values are rejected.
    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        let lookup = match self.config.get::<f64>(&key.to_lowercase()) {
            Err(ConfigError::NotFound(_)) => self.config.get::<f64>(key),
            other => other,
        };

        match lookup {
            Ok(value) if value.is_finite() && value >= 0.0 => value,
            Ok(value) => {
                warn!(key, value, default, "rejecting policy value, using default");
                default
            }
            Err(ConfigError::NotFound(_)) => default,
            Err(e) => {
                warn!(key, error = %e, default, "invalid policy value, using default");
                default
            }
        }
    }
}
