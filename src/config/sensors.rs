//! Configuration structures for the broker connection and the two sensors.
//!
//! These sections mirror the settings of the system this replaces: one
//! broker, one machine sensor with optional environmental gates, one
//! optional presence watcher, and an optional ambience helper. Wireless
//! networks can be given either as a TOML array or as a single delimited
//! string, the format the original settings store used.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::gate::GateSet;
use hivesense_mqtt::BrokerSettings;

/// Broker connection settings.
///
/// An empty URI is accepted at load time; it simply makes every delivery
/// attempt fail, which the pipeline reports through its usual boolean path.
/// Startup misconfiguration shows up as persistent failures, not a crash.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Full `ws://` endpoint of the broker's WebSocket listener.
    #[validate(length(max = 255, message = "Broker URI must not exceed 255 characters"))]
    pub uri: String,

    /// Username for authentication; empty means anonymous.
    pub username: String,

    /// Password for authentication.
    pub password: String,
}

impl BrokerConfig {
    /// Connection settings consumed by the transport.
    pub fn settings(&self) -> BrokerSettings {
        BrokerSettings {
            uri: self.uri.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Accepts seconds as an integer or a string. A string that fails to parse
/// falls back to -1, which disables the associated timer and expiry instead
/// of failing startup.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(value) => value,
        Raw::Text(text) => text.trim().parse().unwrap_or(-1),
    })
}

/// Machine sensor settings: expiry window and environmental gates.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SensorConfig {
    /// Seconds before the hub expires a state value. Values of 1 or less
    /// disable expiry and the resync timer with it.
    #[serde(deserialize_with = "lenient_seconds")]
    pub expire_after: i64,

    /// Require mains power before publishing.
    pub check_power: bool,

    /// Require membership in one of the listed wireless networks.
    pub check_wifi: bool,

    /// Wireless network allow-list as a TOML array.
    pub wifi_networks: Vec<String>,

    /// Wireless network allow-list as one delimited string, merged with
    /// `wifi_networks`. Kept for parity with the delimited settings format.
    pub wifi_networks_text: String,

    /// Delimiter for `wifi_networks_text`.
    #[validate(length(min = 1, message = "Wifi network delimiter must not be empty"))]
    pub wifi_networks_delimiter: String,

    /// Require this serial port to be attached before publishing.
    pub com_port: Option<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            expire_after: 600,
            check_power: false,
            check_wifi: false,
            wifi_networks: Vec::new(),
            wifi_networks_text: String::new(),
            wifi_networks_delimiter: ";".into(),
            com_port: None,
        }
    }
}

impl SensorConfig {
    /// The merged wireless allow-list, in configured order.
    pub fn networks(&self) -> Vec<String> {
        let mut networks = self.wifi_networks.clone();
        networks.extend(
            self.wifi_networks_text
                .split(&self.wifi_networks_delimiter)
                .filter(|entry| !entry.is_empty())
                .map(|entry| entry.to_string()),
        );
        networks
    }

    /// The gate set these settings enable.
    pub fn gate_set(&self) -> GateSet {
        GateSet {
            on_power: self.check_power,
            on_wifi: self.check_wifi,
            wifi_networks: self.networks(),
            com_port: self.com_port.clone(),
        }
    }
}

/// Presence watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PresenceConfig {
    /// Whether the presence sensor runs at all.
    pub enabled: bool,

    /// Seconds between log polls. Non-positive values disable the poll
    /// timer instead of failing startup.
    #[serde(deserialize_with = "lenient_seconds")]
    pub polling_interval: i64,

    /// Path of the status log; when unset, the per-user default location is
    /// used. A missing file at runtime is a normal state.
    pub log_path: Option<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            polling_interval: 600,
            log_path: None,
        }
    }
}

/// Ambience helper settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HelperConfig {
    /// Path of the helper binary; empty disables the helper.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let sensor = SensorConfig::default();
        assert_eq!(sensor.expire_after, 600);
        assert!(!sensor.check_power);
        assert!(!sensor.check_wifi);
        assert!(sensor.networks().is_empty());
        assert_eq!(sensor.wifi_networks_delimiter, ";");

        let presence = PresenceConfig::default();
        assert!(!presence.enabled);
        assert_eq!(presence.polling_interval, 600);
    }

    #[test]
    fn delimited_text_merges_with_the_array() {
        let sensor = SensorConfig {
            wifi_networks: vec!["HomeNet".into()],
            wifi_networks_text: "Cabin;Garage Net".into(),
            ..Default::default()
        };
        assert_eq!(sensor.networks(), vec!["HomeNet", "Cabin", "Garage Net"]);
    }

    #[test]
    fn empty_entries_in_delimited_text_are_dropped() {
        let sensor = SensorConfig {
            wifi_networks_text: ";HomeNet;;".into(),
            ..Default::default()
        };
        assert_eq!(sensor.networks(), vec!["HomeNet"]);
    }

    #[test]
    fn gate_set_reflects_the_flags() {
        let sensor = SensorConfig {
            check_power: true,
            check_wifi: true,
            wifi_networks: vec!["HomeNet".into()],
            com_port: Some("ttyUSB0".into()),
            ..Default::default()
        };
        let gates = sensor.gate_set();
        assert!(gates.on_power);
        assert!(gates.on_wifi);
        assert_eq!(gates.wifi_networks, vec!["HomeNet"]);
        assert_eq!(gates.com_port.as_deref(), Some("ttyUSB0"));
    }

    #[test]
    fn interval_fields_accept_quoted_numbers() {
        let sensor: SensorConfig = toml::from_str(r#"expire_after = "120""#).unwrap();
        assert_eq!(sensor.expire_after, 120);
    }

    #[test]
    fn malformed_intervals_fall_back_to_disabled() {
        let sensor: SensorConfig = toml::from_str(r#"expire_after = "soon""#).unwrap();
        assert_eq!(sensor.expire_after, -1);

        let presence: PresenceConfig = toml::from_str(r#"polling_interval = "often""#).unwrap();
        assert_eq!(presence.polling_interval, -1);
    }

    #[test]
    fn broker_settings_carry_credentials() {
        let broker = BrokerConfig {
            uri: "ws://broker.local:9001/mqtt".into(),
            username: "sensor".into(),
            password: "secret".into(),
        };
        let settings = broker.settings();
        assert_eq!(settings.uri, "ws://broker.local:9001/mqtt");
        assert_eq!(settings.username, "sensor");
        assert_eq!(settings.password, "secret");
    }
}
