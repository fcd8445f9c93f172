//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `loxbridge.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use loxbridge_adapter_miniserver::MiniserverConfig;
use loxbridge_adapter_mqtt::MqttConfig;
use loxbridge_app::config::{AdaptorConfig, GatewayConfig};

const CONFIG_FILE: &str = "loxbridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Miniserver connection.
    pub miniserver: MiniserverConfig,
    /// Topic naming and catalog settings.
    pub adaptor: AdaptorConfig,
    /// Command forwarding and catalog publication.
    pub gateway: GatewayConfig,
    /// Where the structure document comes from.
    pub source: SourceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Structure document source.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Read the structure from this file instead of the Miniserver.
    pub structure_file: Option<PathBuf>,
    /// Re-read the structure every this many seconds; 0 disables reloads.
    pub reload_interval_secs: u64,
    /// Delay between attempts while the first structure cannot be loaded.
    pub retry_delay_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            structure_file: None,
            reload_interval_secs: 0,
            retry_delay_secs: 10,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "loxbridged=info,loxbridge=info,rumqttc=warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `loxbridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("LOXBRIDGE_MQTT_HOST") {
            self.mqtt.host = val;
        }
        if let Some(port) = var("LOXBRIDGE_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.port = port;
        }
        if let Some(val) = var("LOXBRIDGE_MINISERVER_HOST") {
            self.miniserver.host = val;
        }
        if let Some(val) = var("LOXBRIDGE_MINISERVER_USERNAME") {
            self.miniserver.username = val;
        }
        if let Some(val) = var("LOXBRIDGE_MINISERVER_PASSWORD") {
            self.miniserver.password = Some(val);
        }
        if let Some(readonly) = var("LOXBRIDGE_READONLY").and_then(|val| parse_flag(&val)) {
            self.gateway.readonly = readonly;
        }
        if let Some(val) = var("LOXBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.port == 0 {
            return Err(ConfigError::Validation(
                "mqtt port must be non-zero".to_string(),
            ));
        }
        if self.mqtt.qos().is_err() {
            return Err(ConfigError::Validation(format!(
                "mqtt qos must be 0, 1 or 2, got {}",
                self.mqtt.qos
            )));
        }
        if self.source.retry_delay_secs == 0 {
            return Err(ConfigError::Validation(
                "structure retry delay must be non-zero".to_string(),
            ));
        }
        if self.adaptor.prefixes.device.is_empty() {
            return Err(ConfigError::Validation(
                "device prefix must be non-empty".to_string(),
            ));
        }
        if self.adaptor.prefixes.catalog().is_empty() {
            return Err(ConfigError::Validation(
                "catalog prefix must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
