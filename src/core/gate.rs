//! Environmental gating for publish attempts.
//!
//! A gate is a named precondition that must hold for a publish to proceed:
//! the machine is on mains power, it is joined to one of the named wireless
//! networks, a specific serial device is attached. Gates are evaluated
//! against the live environment on every attempt — wifi and power can change
//! between retries, so nothing here is cached.
//!
//! An ineligible gate is expected and frequent. It is not an error; the
//! outcome carries a human-readable reason the shell can surface to the user.

use async_trait::async_trait;

/// Enabled preconditions for one sensor.
///
/// The empty-allow-list behavior is deliberate and preserved from the system
/// this replaces: enabling the wifi check without naming any networks fails
/// closed. An operator who turned the check on but listed nothing should not
/// silently publish from every network.
#[derive(Debug, Clone, Default)]
pub struct GateSet {
    /// Require mains power.
    pub on_power: bool,

    /// Require membership in one of `wifi_networks`.
    pub on_wifi: bool,

    /// Allow-list of wireless network names, compared case-insensitively.
    pub wifi_networks: Vec<String>,

    /// Require this serial port to be attached, compared case-insensitively.
    pub com_port: Option<String>,
}

/// Point-in-time power source reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSnapshot {
    /// Mains power is present.
    pub on_mains: bool,

    /// Running from battery.
    pub on_battery: bool,
}

/// Live environment readings consumed by gate evaluation.
///
/// The production implementation probes the operating system; tests swap in
/// fixed snapshots.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Current power source.
    async fn power(&self) -> PowerSnapshot;

    /// Names of currently-connected wireless networks.
    async fn connected_ssids(&self) -> Vec<String>;

    /// Names of currently-attached serial ports.
    async fn serial_ports(&self) -> Vec<String>;
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// Every enabled gate passed.
    Eligible,

    /// At least one enabled gate failed; the string names the first one.
    Blocked(String),
}

impl GateStatus {
    /// True when publishing may proceed.
    pub fn is_eligible(&self) -> bool {
        matches!(self, GateStatus::Eligible)
    }

    /// The blocking reason, or an empty string when eligible.
    pub fn reason(&self) -> &str {
        match self {
            GateStatus::Eligible => "",
            GateStatus::Blocked(reason) => reason,
        }
    }
}

/// Evaluates every enabled gate against the environment.
///
/// Disabled gates are vacuously eligible; enabled gates must all pass.
/// Evaluation stops at the first blocked gate, whose reason is returned.
pub async fn check(gates: &GateSet, env: &dyn Environment) -> GateStatus {
    if gates.on_power {
        let power = env.power().await;
        if !power.on_mains {
            return GateStatus::Blocked("Not on mains power".into());
        }
    }

    if gates.on_wifi {
        let connected = env.connected_ssids().await;
        let joined = connected.iter().any(|ssid| {
            gates
                .wifi_networks
                .iter()
                .any(|allowed| allowed.to_lowercase() == ssid.to_lowercase())
        });
        if !joined {
            return GateStatus::Blocked("Not on a listed wireless network".into());
        }
    }

    if let Some(wanted) = &gates.com_port {
        let ports = env.serial_ports().await;
        let attached = ports
            .iter()
            .any(|port| port.to_lowercase() == wanted.to_lowercase());
        if !attached {
            return GateStatus::Blocked(format!("Serial port {wanted} not attached"));
        }
    }

    GateStatus::Eligible
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed environment readings for tests.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FixedEnvironment {
        pub on_mains: bool,
        pub ssids: Vec<String>,
        pub ports: Vec<String>,
    }

    #[async_trait]
    impl Environment for FixedEnvironment {
        async fn power(&self) -> PowerSnapshot {
            PowerSnapshot {
                on_mains: self.on_mains,
                on_battery: !self.on_mains,
            }
        }

        async fn connected_ssids(&self) -> Vec<String> {
            self.ssids.clone()
        }

        async fn serial_ports(&self) -> Vec<String> {
            self.ports.clone()
        }
    }

    fn wifi_gate(networks: &[&str]) -> GateSet {
        GateSet {
            on_wifi: true,
            wifi_networks: networks.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_gates_is_always_eligible() {
        let env = FixedEnvironment::default();
        let status = check(&GateSet::default(), &env).await;
        assert!(status.is_eligible());
        assert_eq!(status.reason(), "");
    }

    #[tokio::test]
    async fn power_gate_blocks_on_battery() {
        let gates = GateSet {
            on_power: true,
            ..Default::default()
        };
        let env = FixedEnvironment {
            on_mains: false,
            ..Default::default()
        };
        let status = check(&gates, &env).await;
        assert_eq!(status, GateStatus::Blocked("Not on mains power".into()));

        let env = FixedEnvironment {
            on_mains: true,
            ..Default::default()
        };
        assert!(check(&gates, &env).await.is_eligible());
    }

    #[tokio::test]
    async fn wifi_gate_with_empty_allow_list_fails_closed() {
        let gates = wifi_gate(&[]);
        let env = FixedEnvironment {
            ssids: vec!["HomeNet".into(), "OfficeNet".into()],
            ..Default::default()
        };
        assert!(!check(&gates, &env).await.is_eligible());
    }

    #[tokio::test]
    async fn wifi_gate_matches_case_insensitively() {
        let gates = wifi_gate(&["homenet"]);
        let env = FixedEnvironment {
            ssids: vec!["HomeNet".into()],
            ..Default::default()
        };
        assert!(check(&gates, &env).await.is_eligible());
    }

    #[tokio::test]
    async fn wifi_gate_blocks_on_unlisted_network() {
        let gates = wifi_gate(&["HomeNet"]);
        let env = FixedEnvironment {
            ssids: vec!["OfficeNet".into()],
            ..Default::default()
        };
        let status = check(&gates, &env).await;
        assert!(!status.is_eligible());
        assert!(status.reason().contains("wireless"));
    }

    #[tokio::test]
    async fn serial_gate_matches_case_insensitively() {
        let gates = GateSet {
            com_port: Some("ttyUSB0".into()),
            ..Default::default()
        };
        let env = FixedEnvironment {
            ports: vec!["ttyusb0".into()],
            ..Default::default()
        };
        assert!(check(&gates, &env).await.is_eligible());

        let env = FixedEnvironment {
            ports: vec!["ttyS0".into()],
            ..Default::default()
        };
        let status = check(&gates, &env).await;
        assert_eq!(
            status,
            GateStatus::Blocked("Serial port ttyUSB0 not attached".into())
        );
    }

    #[tokio::test]
    async fn all_enabled_gates_must_pass() {
        let gates = GateSet {
            on_power: true,
            on_wifi: true,
            wifi_networks: vec!["HomeNet".into()],
            com_port: None,
        };
        let env = FixedEnvironment {
            on_mains: true,
            ssids: vec!["HomeNet".into()],
            ..Default::default()
        };
        assert!(check(&gates, &env).await.is_eligible());

        let env = FixedEnvironment {
            on_mains: true,
            ssids: vec!["OfficeNet".into()],
            ..Default::default()
        };
        assert!(!check(&gates, &env).await.is_eligible());
    }
}
