//! Loading and validation of `config.toml`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{AccessoryConfig, DeviceConfig, TvlinkConfig, DEFAULT_INTERVAL_MS, MIN_INTERVAL_MS};
use tvlink_core::prelude::*;
use tvlink_core::{DeviceIdentity, MacAddress, SourceDefinition, DEFAULT_DEVICE_NAME};

const CONFIG_FILENAME: &str = "config.toml";
const TVLINK_DIR: &str = "tvlink";

/// Default location: `<config dir>/tvlink/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(TVLINK_DIR)
        .join(CONFIG_FILENAME)
}

/// Read and parse a configuration file
///
/// Unlike per-device validation, an unreadable or unparsable file is an
/// error for the whole process.
pub fn load_config(path: &Path) -> Result<TvlinkConfig> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let config: TvlinkConfig = toml::from_str(&content)
        .map_err(|e| Error::config_invalid(format!("{}: {}", path.display(), e)))?;

    debug!(
        "Loaded {} accessory entries from {:?}",
        config.accessories.len(),
        path
    );
    Ok(config)
}

/// Write a commented starter file unless one already exists
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    let default_content = r#"# tvlink configuration

[adb]
# path = "/usr/local/bin/adb"
command_timeout_ms = 10000
retry_limit = 5
launcher_activities = ["Launcher", "MainActivity", "RecentsTvActivity"]
optimistic_source = true

[[accessories]]
name = "Android Television"
address = "192.168.1.20"
mac = "AA:BB:CC:DD:EE:FF"
interval = 5000

[[accessories.sources]]
id = 1
name = "HDMI 1"
key = "KEYCODE_F1"
package = "org.droidtv.playtv"
default = true
"#;

    std::fs::write(path, default_content)?;
    info!("Created default config at {:?}", path);
    Ok(true)
}

/// Effective polling interval: default when unset, floored at the minimum
pub fn effective_interval(configured_ms: Option<u64>) -> Duration {
    let ms = configured_ms.unwrap_or(DEFAULT_INTERVAL_MS);
    if ms < MIN_INTERVAL_MS {
        warn!(
            "Interval of {}ms is too short, using {}ms instead",
            ms, MIN_INTERVAL_MS
        );
        return Duration::from_millis(MIN_INTERVAL_MS);
    }
    Duration::from_millis(ms)
}

/// Turn one raw entry into a [`DeviceConfig`]
pub fn validate_accessory(raw: &AccessoryConfig) -> Result<DeviceConfig> {
    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_DEVICE_NAME);

    let address = raw
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::config(format!("Please provide an address for {}", name)))?;

    let mac = match raw.mac.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(mac) => Some(mac.parse::<MacAddress>()?),
        None => {
            warn!("No MAC address for {}; it cannot be powered on", name);
            None
        }
    };

    validate_sources(&raw.sources)?;

    Ok(DeviceConfig {
        identity: DeviceIdentity::new(address, mac, name),
        interval: effective_interval(raw.interval),
        sources: raw.sources.clone(),
        apps: raw.apps.clone(),
    })
}

/// Validate every accessory entry, preserving order
pub fn validate_all(config: &TvlinkConfig) -> Vec<Result<DeviceConfig>> {
    config.accessories.iter().map(validate_accessory).collect()
}

fn validate_sources(sources: &[SourceDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.id) {
            return Err(Error::config_invalid(format!(
                "duplicate source id {}",
                source.id
            )));
        }
        if !is_shell_token(&source.key_code) {
            return Err(Error::config_invalid(format!(
                "source {} has an invalid key code {:?}",
                source.id, source.key_code
            )));
        }
    }
    Ok(())
}

/// Key codes end up inside a shell command line on the device
fn is_shell_token(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
