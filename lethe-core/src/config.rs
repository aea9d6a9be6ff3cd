//! Configuration types for the eviction engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LetheError, Result};
use crate::eviction::{EvictionPolicy, EvictionStrategy};
use crate::recovery::RecoverySettings;

/// Engine-wide configuration, fixed once the engine is built
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LetheConfig {
    /// Eviction policies; the applicable one with the highest threshold runs
    pub policies: Vec<EvictionPolicy>,

    /// Compress oversized survivors during eviction cycles
    pub enable_compression: bool,

    /// Allow recovery points and restores
    pub enable_recovery: bool,

    /// Minimum time between automatic checkpoint passes
    #[serde(with = "humantime_serde")]
    pub recovery_point_interval: Duration,

    /// Pressure monitor tick interval
    #[serde(with = "humantime_serde")]
    pub monitoring_interval: Duration,

    /// Byte budget used when the host supplies no capacity provider
    pub max_bytes: u64,

    /// Oldest recovery points are dropped beyond this count
    pub max_recovery_points: usize,

    /// Pressure samples kept in history
    pub pressure_history_limit: usize,

    /// Eviction results kept in history
    pub eviction_history_limit: usize,

    /// Entries above this importance are checkpointed automatically
    pub auto_checkpoint_importance: f64,
}

impl Default for LetheConfig {
    fn default() -> Self {
        Self {
            policies: vec![
                EvictionPolicy::new(EvictionStrategy::Lru, 0.75).with_min_keep_count(10),
                EvictionPolicy::new(EvictionStrategy::Hybrid, 0.9)
                    .with_min_keep_count(5)
                    .with_compression_threshold(10_000),
            ],
            enable_compression: true,
            enable_recovery: true,
            recovery_point_interval: Duration::from_secs(300),
            monitoring_interval: Duration::from_secs(5),
            max_bytes: 100 * 1024 * 1024,
            max_recovery_points: 1_000,
            pressure_history_limit: 100,
            eviction_history_limit: 50,
            auto_checkpoint_importance: 0.7,
        }
    }
}

impl LetheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder from defaults
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (lethe.toml, then the path in LETHE_CONFIG_PATH)
    /// 3. Environment variable overrides (`LETHE_`, nested with `__`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is invalid or the result
    /// fails validation.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Toml},
        };

        let mut figment = Figment::new().merge(Toml::file("lethe.toml"));

        if let Ok(path) = std::env::var("LETHE_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: LetheConfig = figment
            .merge(Env::prefixed("LETHE_").split("__"))
            .extract()
            .map_err(|e| {
                LetheError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Toml},
        };

        let config: LetheConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| {
                LetheError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for thresholds outside `[0, 1]`, a zero byte budget,
    /// a zero monitoring interval or zero history limits.
    pub fn validate(&self) -> Result<()> {
        for (i, policy) in self.policies.iter().enumerate() {
            if !(0.0..=1.0).contains(&policy.threshold) {
                return Err(LetheError::Configuration(format!(
                    "policy {} threshold {} is outside [0, 1]",
                    i, policy.threshold
                )));
            }
        }

        if self.max_bytes == 0 {
            return Err(LetheError::Configuration(
                "max_bytes must be greater than zero".to_string(),
            ));
        }

        if self.monitoring_interval.is_zero() {
            return Err(LetheError::Configuration(
                "monitoring_interval must be greater than zero".to_string(),
            ));
        }

        if self.pressure_history_limit == 0 || self.eviction_history_limit == 0 {
            return Err(LetheError::Configuration(
                "history limits must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Settings for the recovery point manager
    pub fn recovery_settings(&self) -> RecoverySettings {
        RecoverySettings {
            enabled: self.enable_recovery,
            interval_ms: self.recovery_point_interval.as_millis() as u64,
            auto_importance: self.auto_checkpoint_importance,
            max_points: self.max_recovery_points,
        }
    }
}

/// Builder for LetheConfig
pub struct ConfigBuilder {
    config: LetheConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: LetheConfig::default(),
        }
    }

    /// Replace all policies
    pub fn policies(mut self, policies: Vec<EvictionPolicy>) -> Self {
        self.config.policies = policies;
        self
    }

    /// Append a policy
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.policies.push(policy);
        self
    }

    /// Enable or disable compression
    pub fn enable_compression(mut self, enabled: bool) -> Self {
        self.config.enable_compression = enabled;
        self
    }

    /// Enable or disable recovery points
    pub fn enable_recovery(mut self, enabled: bool) -> Self {
        self.config.enable_recovery = enabled;
        self
    }

    /// Set the automatic checkpoint interval
    pub fn recovery_point_interval(mut self, interval: Duration) -> Self {
        self.config.recovery_point_interval = interval;
        self
    }

    /// Set the monitor tick interval
    pub fn monitoring_interval(mut self, interval: Duration) -> Self {
        self.config.monitoring_interval = interval;
        self
    }

    /// Set the default byte budget
    pub fn max_bytes(mut self, bytes: u64) -> Self {
        self.config.max_bytes = bytes;
        self
    }

    /// Set the recovery point cap
    pub fn max_recovery_points(mut self, count: usize) -> Self {
        self.config.max_recovery_points = count;
        self
    }

    /// Set the automatic checkpoint importance threshold
    pub fn auto_checkpoint_importance(mut self, importance: f64) -> Self {
        self.config.auto_checkpoint_importance = importance.clamp(0.0, 1.0);
        self
    }

    /// Build the configuration
    pub fn build(self) -> LetheConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LetheConfig::default();
        assert_eq!(config.policies.len(), 2);
        assert!(config.enable_compression);
        assert!(config.enable_recovery);
        assert_eq!(config.pressure_history_limit, 100);
        assert_eq!(config.eviction_history_limit, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = LetheConfig::builder()
            .policies(vec![EvictionPolicy::new(EvictionStrategy::Size, 0.6)])
            .enable_compression(false)
            .monitoring_interval(Duration::from_millis(250))
            .max_bytes(1_000)
            .auto_checkpoint_importance(3.0)
            .build();

        assert_eq!(config.policies[0].strategy, EvictionStrategy::Size);
        assert!(!config.enable_compression);
        assert_eq!(config.monitoring_interval, Duration::from_millis(250));
        assert_eq!(config.max_bytes, 1_000);
        assert_eq!(config.auto_checkpoint_importance, 1.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = LetheConfig::builder()
            .policy(EvictionPolicy::new(EvictionStrategy::Lru, 1.5))
            .build();
        assert!(matches!(config.validate(), Err(LetheError::Configuration(_))));

        let config = LetheConfig::builder().max_bytes(0).build();
        assert!(config.validate().is_err());

        let config = LetheConfig::builder()
            .monitoring_interval(Duration::ZERO)
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recovery_settings() {
        let config = LetheConfig::builder()
            .enable_recovery(false)
            .recovery_point_interval(Duration::from_secs(2))
            .max_recovery_points(7)
            .build();

        let settings = config.recovery_settings();
        assert!(!settings.enabled);
        assert_eq!(settings.interval_ms, 2_000);
        assert_eq!(settings.max_points, 7);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
enable_compression = false
monitoring_interval = "250ms"
max_bytes = 1000000

[[policies]]
strategy = "lru"
threshold = 0.75
min_keep_count = 3
"#
        )
        .expect("write config");

        let config = LetheConfig::from_file(file.path()).expect("config loads");
        assert!(!config.enable_compression);
        assert!(config.enable_recovery);
        assert_eq!(config.monitoring_interval, Duration::from_millis(250));
        assert_eq!(config.max_bytes, 1_000_000);
        assert_eq!(config.policies.len(), 1);
        assert_eq!(config.policies[0].min_keep_count, 3);
    }

    #[test]
    fn test_from_file_rejects_invalid_threshold() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
[[policies]]
strategy = "size"
threshold = 2.0
"#
        )
        .expect("write config");

        assert!(LetheConfig::from_file(file.path()).is_err());
    }
}
