//! # tvlink-adb - adb Process Management
//!
//! Runs `adb` as a child process, turns its output into typed facts, and keeps
//! the adb session to a device address alive. Also sends wake-on-LAN packets,
//! the only way to power on a TV whose adb daemon is asleep.
//!
//! Depends on [`tvlink_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Execution
//! - [`CommandRunner`] - Run an [`AdbCommand`] with a timeout
//! - [`AdbRunner`] - Runner backed by the local adb executable
//! - [`AdbTool`] - Locate adb on `PATH` or in the Android SDK
//!
//! ### Output Parsing
//! - [`parse_power()`] - Screen power from `dumpsys power`
//! - [`parse_focused_source()`] - Focused package from `dumpsys window`
//! - [`parse_product_info()`] - Model, manufacturer and serial from `getprop`
//! - [`parse_device_list()`] - Entries of `adb devices`
//!
//! ### Connection
//! - [`ConnectionManager`] - Connect, reset and adopt adb sessions
//!
//! ### Wake-on-LAN
//! - [`WakeOnLan`], [`UdpWakeOnLan`] - Magic packet delivery

pub mod commands;
pub mod connection;
pub mod output;
pub mod runner;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool;
pub mod wol;

pub use commands::{
    AdbCommand, FOCUSED_WINDOW_QUERY, KEYCODE_SLEEP, KEYCODE_WAKEUP, POWER_STATE_QUERY,
    PRODUCT_INFO_QUERY,
};
pub use connection::{classify_connect_output, ConnectOutcome, ConnectionManager};
pub use output::{
    parse_device_list, parse_focused_source, parse_power, parse_product_info, DeviceEntry,
    DeviceEntryState, FocusedApp, DEFAULT_LAUNCHER_ACTIVITIES,
};
pub use runner::{AdbRunner, CommandRunner, LocalCommandRunner, DEFAULT_COMMAND_TIMEOUT};
pub use tool::AdbTool;
pub use wol::{magic_packet, LocalWakeOnLan, UdpWakeOnLan, WakeOnLan, DEFAULT_WOL_TARGET};
