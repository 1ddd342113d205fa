//! Domain types shared by the adb layer and the device sessions

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Numeric identifier of an input source, unique within one device
pub type SourceId = u32;

/// Display name used when a device config does not name the TV
pub const DEFAULT_DEVICE_NAME: &str = "Android Television";

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2})(?:[:-]([0-9A-Fa-f]{2})){5}$").expect("Invalid MAC pattern regex")
});

// ─────────────────────────────────────────────────────────────────
// Power / Phase
// ─────────────────────────────────────────────────────────────────

/// Last observed or commanded power state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    #[default]
    Unknown,
}

impl PowerState {
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }

    /// Value pushed to the accessory layer, `None` while unknown
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PowerState::On => Some(true),
            PowerState::Off => Some(false),
            PowerState::Unknown => None,
        }
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
            PowerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Lifecycle phase of a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Degraded,
    /// Retry ceiling reached, polling cancelled for good
    Stopped,
}

impl SessionPhase {
    /// Whether the poll scheduler should still be running in this phase
    pub fn is_polling(&self) -> bool {
        !matches!(self, SessionPhase::Stopped)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Initializing => "initializing",
            SessionPhase::Ready => "ready",
            SessionPhase::Degraded => "degraded",
            SessionPhase::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Transport state tracked by the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

// ─────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────

/// A 48-bit hardware address, used as the wake-on-LAN target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !MAC_PATTERN.is_match(trimmed) {
            return Err(Error::config_invalid(format!(
                "\"{}\" is not a MAC address (expected AA:BB:CC:DD:EE:FF)",
                s
            )));
        }

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(trimmed.split([':', '-'])) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|e| Error::config_invalid(format!("bad MAC octet {}: {}", part, e)))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl Serialize for MacAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Who a session talks to. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// Network locator handed to `adb connect` (`host` or `host:port`)
    pub address: String,
    /// Only needed to wake the TV; power-on fails without it
    pub mac: Option<MacAddress>,
    pub name: String,
}

impl DeviceIdentity {
    pub fn new(
        address: impl Into<String>,
        mac: impl Into<Option<MacAddress>>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            mac: mac.into(),
            name: name.into(),
        }
    }
}

/// Model/manufacturer/serial reported by the device's system properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductIdentity {
    pub model: String,
    pub manufacturer: String,
    pub serial: Option<String>,
}

impl ProductIdentity {
    /// Serial number, or the given fallback (the device address) when the
    /// device did not report one
    pub fn serial_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.serial.as_deref().unwrap_or(fallback)
    }
}

// ─────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────

/// A selectable input source on the TV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub id: SourceId,
    pub name: String,
    /// Key-event code sent to switch to this source (e.g. `KEYCODE_F1`)
    #[serde(rename = "key")]
    pub key_code: String,
    /// Application package that is focused while this source is shown
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

impl SourceDefinition {
    pub fn new(id: SourceId, name: impl Into<String>, key_code: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            key_code: key_code.into(),
            package: None,
            is_default: false,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// An app entry from the configuration. Stored, not acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDefinition {
    pub id: String,
    pub name: String,
}

// ─────────────────────────────────────────────────────────────────
// Device State
// ─────────────────────────────────────────────────────────────────

/// Last observed-or-commanded truth about a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceState {
    pub power: PowerState,
    pub active_source_id: Option<SourceId>,
    pub retry_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac_colon_and_dash() {
        let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        let mac: MacAddress = "01-23-45-67-89-AB".parse().unwrap();
        assert_eq!(mac.to_string(), "01:23:45:67:89:AB");
    }

    #[test]
    fn test_parse_mac_rejects_garbage() {
        assert!("".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:gg".parse::<MacAddress>().is_err());
        assert!("aabbccddeeff".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_power_state_conversions() {
        assert_eq!(PowerState::from(true), PowerState::On);
        assert_eq!(PowerState::from(false), PowerState::Off);
        assert_eq!(PowerState::Unknown.as_bool(), None);
        assert_eq!(PowerState::On.as_bool(), Some(true));
        assert!(!PowerState::Unknown.is_on());
    }

    #[test]
    fn test_device_state_default() {
        let state = DeviceState::default();
        assert_eq!(state.power, PowerState::Unknown);
        assert!(state.active_source_id.is_none());
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn test_serial_fallback() {
        let product = ProductIdentity {
            model: "55OLED806/12".to_string(),
            manufacturer: "Philips".to_string(),
            serial: None,
        };
        assert_eq!(product.serial_or("192.168.1.20"), "192.168.1.20");
    }

    #[test]
    fn test_source_definition_deserialize() {
        let source: SourceDefinition = serde_json::from_str(
            r#"{"id": 1, "name": "HDMI 1", "key": "KEYCODE_F1", "default": true}"#,
        )
        .unwrap();
        assert_eq!(source.key_code, "KEYCODE_F1");
        assert!(source.is_default);
        assert!(source.package.is_none());
    }

    #[test]
    fn test_stopped_phase_does_not_poll() {
        assert!(SessionPhase::Ready.is_polling());
        assert!(SessionPhase::Degraded.is_polling());
        assert!(!SessionPhase::Stopped.is_polling());
    }
}
