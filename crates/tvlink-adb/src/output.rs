//! Parsing of adb command output into typed facts
//!
//! All functions here are pure. Malformed input fails closed: a power query
//! that does not say exactly `true` is "off", and a focused-window dump
//! without the `<package>/<activity>` structure is a parse error.

use std::sync::LazyLock;

use regex::Regex;
use tvlink_core::prelude::*;
use tvlink_core::ProductIdentity;

/// Activity names that mean the home screen is focused
pub const DEFAULT_LAUNCHER_ACTIVITIES: &[&str] = &["Launcher", "MainActivity", "RecentsTvActivity"];

/// `<package>/<activity>` as it appears inside an `ActivityRecord{...}`
static COMPONENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\s/{}]+)/(\S+)").expect("Invalid component pattern regex"));

/// What the window manager reports as focused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusedApp {
    /// The home screen / launcher
    Launcher,
    /// Any other application, identified by its package
    Package(String),
}

/// Interpret the output of the power-state query
///
/// Exactly `true` after trimming means on. Case matters.
pub fn parse_power(output: &str) -> bool {
    output.trim() == "true"
}

/// Parse the three `getprop` lines: model, manufacturer, serial
///
/// A missing or blank serial yields `serial: None`; substituting the device
/// address is the caller's job.
pub fn parse_product_info(output: &str) -> Result<ProductIdentity> {
    let mut fields = output.lines().map(str::trim);

    let model = fields.next().unwrap_or_default();
    let manufacturer = fields.next().unwrap_or_default();
    let serial = fields.next().filter(|s| !s.is_empty());

    if model.is_empty() || manufacturer.is_empty() {
        return Err(Error::parse(format!(
            "expected model and manufacturer lines, got {:?}",
            output
        )));
    }

    Ok(ProductIdentity {
        model: model.to_string(),
        manufacturer: manufacturer.to_string(),
        serial: serial.map(str::to_string),
    })
}

/// Parse a focused-window line such as
/// `mFocusedApp=ActivityRecord{eb72d8f u0 org.droidtv.playtv/.PlayTvActivity t30}`
///
/// The activity class is compared against `launcher_activities` by substring.
pub fn parse_focused_source<S: AsRef<str>>(
    output: &str,
    launcher_activities: &[S],
) -> Result<FocusedApp> {
    let caps = output
        .lines()
        .find_map(|line| COMPONENT_PATTERN.captures(line))
        .ok_or_else(|| Error::parse(format!("no package/activity in {:?}", output.trim())))?;

    let package = &caps[1];
    let activity = caps[2].trim_end_matches('}');

    if activity.is_empty() {
        return Err(Error::parse(format!("empty activity in {:?}", output.trim())));
    }

    let is_launcher = launcher_activities
        .iter()
        .map(AsRef::as_ref)
        .any(|name| !name.is_empty() && activity.contains(name));

    if is_launcher {
        Ok(FocusedApp::Launcher)
    } else {
        Ok(FocusedApp::Package(package.to_string()))
    }
}

/// Connection state of an `adb devices` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEntryState {
    Device,
    Offline,
    Unauthorized,
    Other(String),
}

/// One line of `adb devices`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: DeviceEntryState,
}

impl DeviceEntry {
    /// Whether this entry is the device at `address`
    ///
    /// `adb connect 10.0.0.5` lists the device as `10.0.0.5:5555`.
    pub fn matches_address(&self, address: &str) -> bool {
        self.serial == address
            || self
                .serial
                .strip_prefix(address)
                .is_some_and(|rest| rest.starts_with(':'))
    }

    pub fn is_usable(&self) -> bool {
        self.state == DeviceEntryState::Device
    }
}

/// Parse the output of `adb devices`
///
/// The header and daemon start-up chatter (`* daemon started ...`) are skipped.
pub fn parse_device_list(output: &str) -> Vec<DeviceEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = match parts.next()? {
                "device" => DeviceEntryState::Device,
                "offline" => DeviceEntryState::Offline,
                "unauthorized" => DeviceEntryState::Unauthorized,
                other => DeviceEntryState::Other(other.to_string()),
            };
            Some(DeviceEntry {
                serial: serial.to_string(),
                state,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHILIPS_FOCUS: &str = "mFocusedApp=AppWindowToken{e3cc25 token=Token{f7a281c ActivityRecord{eb72d8f u0 org.droidtv.playtv/.PlayTvActivity t30}}}";

    #[test]
    fn test_parse_power_exact_true() {
        assert!(parse_power("true"));
        assert!(parse_power("true\n"));
        assert!(parse_power("  true \r\n"));
    }

    #[test]
    fn test_parse_power_everything_else_is_off() {
        assert!(!parse_power(""));
        assert!(!parse_power("false"));
        assert!(!parse_power("True"));
        assert!(!parse_power("TRUE"));
        assert!(!parse_power("true true"));
        assert!(!parse_power("truee"));
        assert!(!parse_power("error: device offline"));
    }

    #[test]
    fn test_parse_product_info_three_lines() {
        let product = parse_product_info("55OLED806/12\nPhilips\nFZ1A2345678\n").unwrap();
        assert_eq!(product.model, "55OLED806/12");
        assert_eq!(product.manufacturer, "Philips");
        assert_eq!(product.serial.as_deref(), Some("FZ1A2345678"));
    }

    #[test]
    fn test_parse_product_info_missing_serial() {
        let product = parse_product_info("SHIELD Android TV\nNVIDIA\n").unwrap();
        assert_eq!(product.serial, None);

        let product = parse_product_info("SHIELD Android TV\nNVIDIA\n   \n").unwrap();
        assert_eq!(product.serial, None);
    }

    #[test]
    fn test_parse_product_info_malformed() {
        assert!(parse_product_info("").is_err());
        assert!(parse_product_info("OnlyModel").is_err());
    }

    #[test]
    fn test_parse_focused_package() {
        let focused = parse_focused_source(PHILIPS_FOCUS, DEFAULT_LAUNCHER_ACTIVITIES).unwrap();
        assert_eq!(focused, FocusedApp::Package("org.droidtv.playtv".to_string()));
    }

    #[test]
    fn test_parse_focused_launcher() {
        let line = "mFocusedApp=ActivityRecord{8b7b1ad u0 com.google.android.tvlauncher/.MainActivity t1}";
        let focused = parse_focused_source(line, DEFAULT_LAUNCHER_ACTIVITIES).unwrap();
        assert_eq!(focused, FocusedApp::Launcher);

        let line = "mFocusedApp=ActivityRecord{1 u0 com.android.systemui/.recents.RecentsTvActivity t2}";
        assert_eq!(
            parse_focused_source(line, DEFAULT_LAUNCHER_ACTIVITIES).unwrap(),
            FocusedApp::Launcher
        );
    }

    #[test]
    fn test_parse_focused_custom_launcher_names() {
        let names = vec!["PlayTvActivity".to_string()];
        assert_eq!(
            parse_focused_source(PHILIPS_FOCUS, &names).unwrap(),
            FocusedApp::Launcher
        );

        let none: [&str; 0] = [];
        assert_eq!(
            parse_focused_source(PHILIPS_FOCUS, &none).unwrap(),
            FocusedApp::Package("org.droidtv.playtv".to_string())
        );
    }

    #[test]
    fn test_parse_focused_takes_first_component_line() {
        let output = "  mFocusedApp=null\n  mFocusedApp=ActivityRecord{2 u0 com.netflix.ninja/.MainActivity t4}\n";
        let names = ["Launcher"];
        assert_eq!(
            parse_focused_source(output, &names).unwrap(),
            FocusedApp::Package("com.netflix.ninja".to_string())
        );
    }

    #[test]
    fn test_parse_focused_malformed() {
        assert!(parse_focused_source("", DEFAULT_LAUNCHER_ACTIVITIES).is_err());
        assert!(parse_focused_source("mFocusedApp=null", DEFAULT_LAUNCHER_ACTIVITIES).is_err());
        assert!(matches!(
            parse_focused_source("no structure here", DEFAULT_LAUNCHER_ACTIVITIES),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_device_list() {
        let output = "* daemon not running; starting now at tcp:5037\n* daemon started successfully\nList of devices attached\n192.168.1.20:5555\tdevice\nemulator-5554\toffline\n10.0.0.7:5555\tunauthorized\n\n";
        let devices = parse_device_list(output);

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].serial, "192.168.1.20:5555");
        assert!(devices[0].is_usable());
        assert_eq!(devices[1].state, DeviceEntryState::Offline);
        assert_eq!(devices[2].state, DeviceEntryState::Unauthorized);
    }

    #[test]
    fn test_parse_device_list_empty() {
        assert!(parse_device_list("List of devices attached\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn test_device_entry_matches_address() {
        let entry = DeviceEntry {
            serial: "192.168.1.20:5555".to_string(),
            state: DeviceEntryState::Device,
        };
        assert!(entry.matches_address("192.168.1.20"));
        assert!(entry.matches_address("192.168.1.20:5555"));
        assert!(!entry.matches_address("192.168.1.2"));
        assert!(!entry.matches_address("192.168.1.200"));
    }
}
