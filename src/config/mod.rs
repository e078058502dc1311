//! Application configuration loading, validation, and management.
//!
//! The top-level `Config` aggregates logging, broker, sensor, presence, and
//! helper settings. It is loaded from a TOML file early in the application
//! lifecycle and is immutable thereafter. Every section has defaults, so a
//! partial file still produces a usable configuration; only an unreadable or
//! syntactically-broken file is a startup error.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::config::{
    logger::LoggerConfig,
    sensors::{BrokerConfig, HelperConfig, PresenceConfig, SensorConfig},
};

pub mod logger;
pub mod sensors;

/// Simple macros for printing timestamped messages before the tracing
/// subscriber is initialized. These are used during early configuration
/// loading.
#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("INFO").green(),
            format_args!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! print_warn {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("WARN").yellow(),
            format_args!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        println!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::parse(
                        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
                    ).unwrap())
                    .unwrap()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        )
    };
}

/// Errors that can occur during configuration loading, parsing, or
/// validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Generic configuration-related error with a descriptive message.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while accessing configuration files.
    #[error("IO error while reading configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure to parse the TOML configuration file.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Validation failure after successful parsing.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Top-level application configuration.
#[derive(Serialize, Deserialize, Debug, Validate, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Logging subsystem configuration.
    pub logger: LoggerConfig,

    /// Broker connection settings shared by all sensors.
    #[validate(nested)]
    pub broker: BrokerConfig,

    /// Machine sensor settings: expiry window and environmental gates.
    #[validate(nested)]
    pub sensor: SensorConfig,

    /// Presence watcher settings.
    #[validate(nested)]
    pub presence: PresenceConfig,

    /// Ambience helper settings.
    pub helper: HelperConfig,
}

impl Config {
    /// Constructs a new configuration by locating and loading the config file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration file cannot be found,
    /// read, parsed, or validated.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load(&config_path)
    }

    /// Determines the configuration file path.
    ///
    /// Priority:
    /// 1. `HIVESENSE_CONFIG` environment variable
    /// 2. `/etc/hivesense/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Config` if no suitable file is found.
    fn get_config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(config_path) = std::env::var("HIVESENSE_CONFIG") {
            let path = PathBuf::from(config_path);
            print_info!("Using config from HIVESENSE_CONFIG: {}", path.display());
            return Ok(path);
        }

        let fallback = Path::new("/etc/hivesense/config.toml");
        if fallback.exists() {
            print_info!("Using default config path: {}", fallback.display());
            return Ok(fallback.to_path_buf());
        }

        Err(ConfigError::Config(
            "No configuration file found.".to_string(),
        ))
    }

    /// Loads and validates configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Propagates IO, parsing, and validation errors as `ConfigError`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        print_info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::Config(path.to_string_lossy().to_string()));
        }

        let config_str = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&config_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        print_info!("Successfully loaded config from: {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[broker]
uri = "ws://broker.local:9001/mqtt"
username = "sensor"
password = "secret"
"#
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.broker.uri, "ws://broker.local:9001/mqtt");
        assert_eq!(config.sensor.expire_after, 600);
        assert!(!config.presence.enabled);
        assert_eq!(config.logger.level, "info");
    }

    #[test]
    fn full_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[logger]
level = "debug"

[broker]
uri = "ws://broker.local:9001/mqtt"
username = "sensor"
password = "secret"

[sensor]
expire_after = 120
check_power = true
check_wifi = true
wifi_networks = ["HomeNet", "HomeNet 5G"]
com_port = "ttyUSB0"

[presence]
enabled = true
polling_interval = 300
log_path = "/tmp/logs.txt"

[helper]
path = "/usr/local/bin/ambience-remote"
"#
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sensor.expire_after, 120);
        assert!(config.sensor.check_power);
        assert_eq!(config.sensor.networks().len(), 2);
        assert_eq!(config.sensor.com_port.as_deref(), Some("ttyUSB0"));
        assert!(config.presence.enabled);
        assert_eq!(config.presence.polling_interval, 300);
        assert_eq!(config.helper.path, "/usr/local/bin/ambience-remote");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[broker\nuri=").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::Config(_))));
    }
}
