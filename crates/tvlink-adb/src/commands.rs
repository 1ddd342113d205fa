//! The adb invocations tvlink issues
//!
//! Only four shapes exist: the device listing, `connect`, `disconnect`, and a
//! shell passthrough addressed to one device with `-s`.

use std::fmt;

/// Reads `ro.product.model`, `ro.product.manufacturer` and `ro.serialno`, one per line
pub const PRODUCT_INFO_QUERY: &str =
    "getprop ro.product.model && getprop ro.product.manufacturer && getprop ro.serialno";

/// Prints `true` while the display is held on
pub const POWER_STATE_QUERY: &str = "dumpsys power | grep mHoldingDisplay | cut -d = -f 2";

/// Prints the `mFocusedApp=...` line(s) of the window manager dump
pub const FOCUSED_WINDOW_QUERY: &str = "dumpsys window windows | grep -E mFocusedApp";

pub const KEYCODE_WAKEUP: &str = "KEYCODE_WAKEUP";
pub const KEYCODE_SLEEP: &str = "KEYCODE_SLEEP";

/// A single adb invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdbCommand {
    /// `adb devices`
    Devices,
    /// `adb connect <address>`
    Connect { address: String },
    /// `adb disconnect <address>`
    Disconnect { address: String },
    /// `adb -s <address> shell <command>`
    Shell { address: String, command: String },
}

impl AdbCommand {
    pub fn connect(address: impl Into<String>) -> Self {
        Self::Connect {
            address: address.into(),
        }
    }

    pub fn disconnect(address: impl Into<String>) -> Self {
        Self::Disconnect {
            address: address.into(),
        }
    }

    pub fn shell(address: impl Into<String>, command: impl Into<String>) -> Self {
        Self::Shell {
            address: address.into(),
            command: command.into(),
        }
    }

    /// `input keyevent <code>` on the given device
    pub fn key_event(address: impl Into<String>, code: &str) -> Self {
        Self::shell(address, format!("input keyevent {}", code))
    }

    /// Arguments passed to the adb executable
    pub fn args(&self) -> Vec<String> {
        match self {
            AdbCommand::Devices => vec!["devices".to_string()],
            AdbCommand::Connect { address } => vec!["connect".to_string(), address.clone()],
            AdbCommand::Disconnect { address } => vec!["disconnect".to_string(), address.clone()],
            AdbCommand::Shell { address, command } => vec![
                "-s".to_string(),
                address.clone(),
                "shell".to_string(),
                command.clone(),
            ],
        }
    }

    /// Whether this is a key-event shell command for `code`
    pub fn is_key_event(&self, code: &str) -> bool {
        match self {
            AdbCommand::Shell { command, .. } => command
                .strip_prefix("input keyevent ")
                .is_some_and(|c| c == code),
            _ => false,
        }
    }
}

impl fmt::Display for AdbCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdbCommand::Devices => write!(f, "adb devices"),
            AdbCommand::Connect { address } => write!(f, "adb connect {}", address),
            AdbCommand::Disconnect { address } => write!(f, "adb disconnect {}", address),
            AdbCommand::Shell { address, command } => {
                write!(f, "adb -s {} shell \"{}\"", address, command)
            }
        }
    }
}
