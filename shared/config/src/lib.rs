//! Trap Config - Configuration management for the flash sandwich trap
//!
//! Every recognized option and its default is declared here, loaded once at
//! startup and validated before any component sees it:
//! - Default values
//! - Configuration files (TOML)
//! - Environment variables
//! - Flat `parameters` mappings handed over by a driver

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    LoadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Detection thresholds
///
/// Known on the wire as the flat `parameters` mapping. Keys that are left out
/// take the defaults below; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Minimum swap price movement, in percent
    pub min_price_impact: f64,
    /// Minimum flash loan size, in the event's own denomination
    pub min_flash_loan_size: f64,
    /// Blocks beyond the current one still treated as adjacent
    pub max_blocks_between: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_price_impact: 5.0,
            min_flash_loan_size: 100_000.0,
            max_blocks_between: 1,
        }
    }
}

impl DetectionConfig {
    /// Parse a flat `parameters` mapping
    pub fn from_parameters(
        parameters: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ConfigError> {
        let config: DetectionConfig =
            serde_json::from_value(serde_json::Value::Object(parameters.clone()))
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Number of bundles inspected per detection pass
    pub fn lookback(&self) -> usize {
        (self.max_blocks_between as usize).saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_price_impact.is_finite() || self.min_price_impact < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "min_price_impact must be a non-negative number, got {}",
                self.min_price_impact
            )));
        }

        if !self.min_flash_loan_size.is_finite() || self.min_flash_loan_size < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "min_flash_loan_size must be a non-negative number, got {}",
                self.min_flash_loan_size
            )));
        }

        Ok(())
    }
}

/// Driving loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Bundles retained by the correlation window
    pub window_capacity: usize,
    /// Blocks scanned behind the chain head in one-shot mode
    pub start_offset: u64,
    /// Poll interval in follow mode
    pub poll_interval_ms: u64,
    pub stop_on_first_alert: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_capacity: 64,
            start_offset: 10,
            poll_interval_ms: 12_000,
            stop_on_first_alert: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitoringConfig {
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrapConfig {
    pub parameters: DetectionConfig,
    pub monitor: MonitorConfig,
    pub monitoring: MonitoringConfig,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            parameters: DetectionConfig::default(),
            monitor: MonitorConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl FromStr for TrapConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl TrapConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.as_ref().display(), e)))?;

        content.parse()
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Load dotenv if available
        let _ = dotenv::dotenv();

        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Defaults with environment variable overrides, for runs without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        let mut config = Self::default();
        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any `TRAP_*` lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("TRAP_LOG_LEVEL") {
            self.monitoring.log_level = level;
        }

        if let Some(val) = lookup("TRAP_MIN_PRICE_IMPACT") {
            self.parameters.min_price_impact = parse_override("TRAP_MIN_PRICE_IMPACT", &val)?;
        }

        if let Some(val) = lookup("TRAP_MIN_FLASH_LOAN_SIZE") {
            self.parameters.min_flash_loan_size = parse_override("TRAP_MIN_FLASH_LOAN_SIZE", &val)?;
        }

        if let Some(val) = lookup("TRAP_MAX_BLOCKS_BETWEEN") {
            self.parameters.max_blocks_between = parse_override("TRAP_MAX_BLOCKS_BETWEEN", &val)?;
        }

        if let Some(val) = lookup("TRAP_WINDOW_CAPACITY") {
            self.monitor.window_capacity = parse_override("TRAP_WINDOW_CAPACITY", &val)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parameters.validate()?;

        // The window must hold at least one full look-back
        if self.monitor.window_capacity < self.parameters.lookback() {
            return Err(ConfigError::InvalidValue(format!(
                "window_capacity ({}) must be at least max_blocks_between + 1 ({})",
                self.monitor.window_capacity,
                self.parameters.lookback()
            )));
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("poll_interval_ms must be positive".to_string()));
        }

        Ok(())
    }
}

fn parse_override<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{} has an invalid value '{}'", key, value)))
}

/// Builder for TrapConfig
pub struct ConfigBuilder {
    config: TrapConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TrapConfig::default(),
        }
    }

    pub fn parameters(mut self, parameters: DetectionConfig) -> Self {
        self.config.parameters = parameters;
        self
    }

    pub fn min_price_impact(mut self, value: f64) -> Self {
        self.config.parameters.min_price_impact = value;
        self
    }

    pub fn min_flash_loan_size(mut self, value: f64) -> Self {
        self.config.parameters.min_flash_loan_size = value;
        self
    }

    pub fn max_blocks_between(mut self, value: u32) -> Self {
        self.config.parameters.max_blocks_between = value;
        self
    }

    pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
        self.config.monitor = monitor;
        self
    }

    pub fn monitoring(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    pub fn build(self) -> TrapConfig {
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
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TrapConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_detection_defaults() {
        let params = DetectionConfig::default();
        assert_eq!(params.min_price_impact, 5.0);
        assert_eq!(params.min_flash_loan_size, 100_000.0);
        assert_eq!(params.max_blocks_between, 1);
        assert_eq!(params.lookback(), 2);
    }

    #[test]
    fn test_flat_parameters() {
        let json = serde_json::json!({ "min_price_impact": 2.5, "max_blocks_between": 3 });
        let params = DetectionConfig::from_parameters(json.as_object().unwrap()).unwrap();

        assert_eq!(params.min_price_impact, 2.5);
        assert_eq!(params.min_flash_loan_size, 100_000.0);
        assert_eq!(params.lookback(), 4);

        let unknown = serde_json::json!({ "min_price_impcat": 2.5 });
        assert!(matches!(
            DetectionConfig::from_parameters(unknown.as_object().unwrap()),
            Err(ConfigError::ParseError(_))
        ));

        let negative = serde_json::json!({ "min_flash_loan_size": -1 });
        assert!(matches!(
            DetectionConfig::from_parameters(negative.as_object().unwrap()),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_toml_sections() {
        let config: TrapConfig = r#"
            [parameters]
            min_flash_loan_size = 250000

            [monitor]
            window_capacity = 8
        "#
        .parse()
        .unwrap();

        assert_eq!(config.parameters.min_flash_loan_size, 250_000.0);
        assert_eq!(config.parameters.min_price_impact, 5.0);
        assert_eq!(config.monitor.window_capacity, 8);
        assert!(config.monitor.stop_on_first_alert);
        assert_eq!(config.monitoring.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRAP_MIN_PRICE_IMPACT", "7.5"),
            ("TRAP_MAX_BLOCKS_BETWEEN", "2"),
            ("TRAP_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = TrapConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.parameters.min_price_impact, 7.5);
        assert_eq!(config.parameters.max_blocks_between, 2);
        assert_eq!(config.monitoring.log_level, "debug");

        let err = config.apply_overrides(|key| {
            (key == "TRAP_WINDOW_CAPACITY").then(|| "many".to_string())
        });
        assert!(matches!(err, Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_validation() {
        let config = ConfigBuilder::new()
            .max_blocks_between(4)
            .monitor(MonitorConfig {
                window_capacity: 3,
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().min_price_impact(f64::NAN).build();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().min_flash_loan_size(0.0).build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = "environment = \"production\"".parse::<TrapConfig>();
        assert!(matches!(err, Err(ConfigError::ParseError(_))));

        let err = "[monitoring]\nprometheus_port = 9090".parse::<TrapConfig>();
        assert!(matches!(err, Err(ConfigError::ParseError(_))));
    }
}
