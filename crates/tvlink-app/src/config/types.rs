//! Configuration types for tvlink
//!
//! Defines:
//! - `TvlinkConfig` - The raw file contents (`config.toml`)
//! - `AccessoryConfig` - One `[[accessories]]` entry as written by the user
//! - `AdbSettings` - The global `[adb]` table
//! - `DeviceConfig` / `SessionSettings` - Validated values handed to sessions

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tvlink_adb::DEFAULT_LAUNCHER_ACTIVITIES;
use tvlink_core::{AppDefinition, DeviceIdentity, SourceDefinition};

/// Polling interval used when none is configured
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// Shortest polling interval a device may use
pub const MIN_INTERVAL_MS: u64 = 300;

/// Consecutive failures after which polling stops
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

/// Full configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TvlinkConfig {
    #[serde(default)]
    pub adb: AdbSettings,

    #[serde(default)]
    pub accessories: Vec<AccessoryConfig>,
}

/// One configured television, as written in the file
///
/// Every field is optional here; [`super::validate_accessory`] decides what
/// is actually required.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessoryConfig {
    pub name: Option<String>,

    /// Network address of the TV (`ip` is accepted for compatibility)
    #[serde(alias = "ip")]
    pub address: Option<String>,

    pub mac: Option<String>,

    /// Polling interval in milliseconds
    pub interval: Option<u64>,

    #[serde(default)]
    pub sources: Vec<SourceDefinition>,

    #[serde(default)]
    pub apps: Vec<AppDefinition>,
}

/// The global `[adb]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdbSettings {
    /// Path to the adb executable; looked up on `PATH` when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Activity names treated as the home screen
    #[serde(default = "default_launcher_activities")]
    pub launcher_activities: Vec<String>,

    /// Record a requested source before its key-events are confirmed
    #[serde(default = "default_true")]
    pub optimistic_source: bool,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            path: None,
            command_timeout_ms: default_command_timeout_ms(),
            retry_limit: default_retry_limit(),
            launcher_activities: default_launcher_activities(),
            optimistic_source: true,
        }
    }
}

impl AdbSettings {
    /// Settings shared by every session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            command_timeout: Duration::from_millis(self.command_timeout_ms.max(1)),
            retry_limit: self.retry_limit.max(1),
            launcher_activities: self.launcher_activities.clone(),
            optimistic_source: self.optimistic_source,
        }
    }
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_launcher_activities() -> Vec<String> {
    DEFAULT_LAUNCHER_ACTIVITIES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

/// A validated device entry, ready to start a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub identity: DeviceIdentity,
    /// Effective polling interval (already floored)
    pub interval: Duration,
    pub sources: Vec<SourceDefinition>,
    /// Stored for the accessory layer; sessions do not act on apps
    pub apps: Vec<AppDefinition>,
}

/// Behaviour knobs common to all sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub command_timeout: Duration,
    pub retry_limit: u32,
    pub launcher_activities: Vec<String>,
    pub optimistic_source: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        AdbSettings::default().session_settings()
    }
}
