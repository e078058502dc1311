//! Sensor identity and message vocabulary.
//!
//! A `SensorSpec` is the immutable description of one sensor instance: who it
//! is on the broker (name, unique id, topic prefix), how it announces itself
//! to the hub (discovery payload), which environmental gates apply, and how
//! long the hub should trust a state value before expiring it. Everything
//! here is computed once at startup; all messages for one sensor share the
//! same topic prefix for the life of the process.

use serde::Serialize;

use super::gate::GateSet;
use hivesense_mqtt::BrokerSettings;

/// Discovery domain prefix understood by the home-automation hub.
const DISCOVERY_PREFIX: &str = "homeassistant";

/// Payload vocabulary of a sensor.
///
/// The two shapes the engine publishes are a tagged variant here, not a type
/// hierarchy: the pipeline is identical for both, only the payload vocabulary
/// and discovery component differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Publishes `"ON"` / `"OFF"`.
    Binary,

    /// Publishes an arbitrary status token (e.g. `"Away"`, `"Busy"`).
    Enumerated,
}

impl SensorKind {
    /// The hub-side component name used in the discovery topic.
    pub fn component(&self) -> &'static str {
        match self {
            SensorKind::Binary => "binary_sensor",
            SensorKind::Enumerated => "sensor",
        }
    }
}

/// State payload for a binary sensor.
pub fn binary_payload(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// Immutable description of one sensor instance.
#[derive(Debug, Clone)]
pub struct SensorSpec {
    pub kind: SensorKind,
    pub name: String,
    pub unique_id: String,
    pub device_class: String,
    pub topic_prefix: String,

    /// Broker connection settings, captured once at construction.
    pub broker: BrokerSettings,

    /// Seconds after which the hub should consider a state value stale.
    /// Values of 1 or less mean the state never expires and the discovery
    /// record carries no `off_delay` field.
    pub expire_after: i64,

    /// Enabled environmental preconditions.
    pub gates: GateSet,

    /// Seconds between presence polls; only meaningful for the enumerated
    /// presence sensor.
    pub polling_interval: i64,
}

impl SensorSpec {
    /// Builds the binary machine sensor for this host.
    ///
    /// Spaces in the machine name become underscores so the name is usable
    /// as a topic segment.
    pub fn machine(
        machine_name: &str,
        broker: BrokerSettings,
        expire_after: i64,
        gates: GateSet,
    ) -> Self {
        let name = sanitize(machine_name);
        Self {
            kind: SensorKind::Binary,
            unique_id: format!("binary_sensor.winpc.{name}"),
            device_class: "lock".into(),
            topic_prefix: format!("winpc/{name}"),
            name,
            broker,
            expire_after,
            gates,
            polling_interval: 0,
        }
    }

    /// Builds the enumerated presence sensor for this user.
    pub fn user_presence(
        user_name: &str,
        broker: BrokerSettings,
        expire_after: i64,
        gates: GateSet,
        polling_interval: i64,
    ) -> Self {
        let name = sanitize(user_name);
        Self {
            kind: SensorKind::Enumerated,
            unique_id: format!("sensor.microsoft_teams.{name}"),
            device_class: "enum".into(),
            topic_prefix: format!("microsoft_teams/{name}"),
            name,
            broker,
            expire_after,
            gates,
            polling_interval,
        }
    }

    /// Topic carrying state values.
    pub fn state_topic(&self) -> String {
        format!("{}/state", self.topic_prefix)
    }

    /// Topic carrying availability values (`online` / `offline`).
    pub fn availability_topic(&self) -> String {
        format!("{}/available", self.topic_prefix)
    }

    /// Retained discovery topic the hub watches for auto-configuration.
    pub fn discovery_topic(&self) -> String {
        format!(
            "{}/{}/{}/config",
            DISCOVERY_PREFIX,
            self.kind.component(),
            self.name
        )
    }

    /// Builds the discovery record announced to the hub.
    ///
    /// `off_delay` is present only when expiry is configured; the serializer
    /// drops the field entirely otherwise rather than emitting a null.
    pub fn discovery_payload(&self) -> DiscoveryPayload {
        DiscoveryPayload {
            name: self.name.clone(),
            unique_id: self.unique_id.clone(),
            device_class: self.device_class.clone(),
            state_topic: self.state_topic(),
            off_delay: (self.expire_after > 1).then(|| self.expire_after.to_string()),
        }
    }
}

/// JSON body of the retained discovery message. Field names are the
/// snake_case identifiers the hub expects.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveryPayload {
    pub name: String,
    pub unique_id: String,
    pub device_class: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub off_delay: Option<String>,
}

fn sanitize(name: &str) -> String {
    name.trim().replace(' ', "_")
}
