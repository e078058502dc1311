//! Operating-system environment probes.
//!
//! `SystemEnvironment` implements the [`Environment`] trait against the live
//! system: mains power from `/sys/class/power_supply`, wireless networks via
//! `nmcli`, serial ports from `/sys/class/tty`. Probe failures degrade to an
//! empty reading — a gate that cannot observe its precondition behaves as if
//! the precondition is unmet, and the pipeline's retry loop takes it from
//! there. Nothing in this module panics or propagates an error upward.

use std::path::Path;

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, trace};

use super::gate::{Environment, PowerSnapshot};

const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";
const TTY_CLASS_ROOT: &str = "/sys/class/tty";

/// Live probes against the local machine.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironment;

impl SystemEnvironment {
    pub fn new() -> Self {
        SystemEnvironment
    }
}

#[async_trait]
impl Environment for SystemEnvironment {
    /// Reads mains status from the power-supply class tree.
    ///
    /// A machine with no `Mains` supply entry at all (desktops, VMs) counts
    /// as mains-powered: only an adapter that reports itself offline means
    /// we are running on battery.
    async fn power(&self) -> PowerSnapshot {
        let mut saw_mains = false;
        let mut mains_online = false;

        if let Ok(mut entries) = fs::read_dir(POWER_SUPPLY_ROOT).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let supply_type = fs::read_to_string(path.join("type"))
                    .await
                    .unwrap_or_default();
                if supply_type.trim() != "Mains" {
                    continue;
                }
                saw_mains = true;
                let online = fs::read_to_string(path.join("online"))
                    .await
                    .unwrap_or_default();
                if online.trim() == "1" {
                    mains_online = true;
                }
            }
        }

        let on_mains = !saw_mains || mains_online;
        trace!(saw_mains, on_mains, "Power probe");
        PowerSnapshot {
            on_mains,
            on_battery: !on_mains,
        }
    }

    /// Lists active wireless networks via `nmcli`.
    ///
    /// Output format is the terse `active:ssid` pairing; only rows flagged
    /// active are kept. A missing or failing `nmcli` yields no networks.
    async fn connected_ssids(&self) -> Vec<String> {
        let output = match Command::new("nmcli")
            .args(["-t", "-f", "active,ssid", "dev", "wifi"])
            .output()
            .await
        {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(status = ?output.status, "nmcli exited unsuccessfully");
                return Vec::new();
            }
            Err(e) => {
                debug!("nmcli unavailable: {e}");
                return Vec::new();
            }
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| {
                let (active, ssid) = line.split_once(':')?;
                (active == "yes" && !ssid.is_empty()).then(|| ssid.to_string())
            })
            .collect()
    }

    /// Lists attached serial ports.
    ///
    /// Entries under the tty class tree that are backed by a real device
    /// node (a `device` link) are attached hardware ports; the rest are
    /// virtual consoles.
    async fn serial_ports(&self) -> Vec<String> {
        let mut ports = Vec::new();
        if let Ok(mut entries) = fs::read_dir(TTY_CLASS_ROOT).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().join("device").exists() {
                    if let Some(name) = entry.path().file_name() {
                        ports.push(name.to_string_lossy().into_owned());
                    }
                }
            }
        }
        trace!(count = ports.len(), "Serial port probe");
        ports
    }
}

/// This machine's name, usable as a topic segment.
///
/// Reads the kernel hostname; falls back to the `HOSTNAME` environment
/// variable and finally a fixed placeholder so sensor identity derivation
/// never fails at startup.
pub async fn machine_name() -> String {
    if let Ok(name) = fs::read_to_string("/etc/hostname").await {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}

/// The current user's name, from the environment.
pub fn user_name() -> String {
    std::env::var("USER").unwrap_or_else(|_| "user".into())
}

/// Default location of the Teams client log for the current user, mirroring
/// the application-data path layout of the system this replaces.
pub fn default_presence_log() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        Path::new(&home)
            .join(".config")
            .join("Microsoft")
            .join("Teams")
            .join("logs.txt"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn power_probe_never_panics() {
        // Works on machines with or without a power-supply tree.
        let env = SystemEnvironment::new();
        let snapshot = env.power().await;
        assert_ne!(snapshot.on_mains, snapshot.on_battery);
    }

    #[tokio::test]
    async fn serial_probe_returns_port_names() {
        let env = SystemEnvironment::new();
        for port in env.serial_ports().await {
            assert!(!port.is_empty());
            assert!(!port.contains('/'));
        }
    }

    #[tokio::test]
    async fn machine_name_is_never_empty() {
        assert!(!machine_name().await.is_empty());
    }

    #[test]
    fn user_name_is_never_empty() {
        assert!(!user_name().is_empty());
    }
}
