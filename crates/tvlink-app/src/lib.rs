//! # tvlink-app - Device Sessions and Orchestration
//!
//! Runs one session per configured television. Each session is an actor: a
//! tokio task that owns the device's adb connection and state, serving
//! intents and poll ticks from a queue.
//!
//! Depends on [`tvlink_core`] for domain types and [`tvlink_adb`] for talking
//! to devices.
//!
//! ## Public API
//!
//! ### Sessions
//! - [`DeviceSession`] - Power, source switching and status reconciliation
//! - [`SessionHandle`] - Send intents to a running session
//! - [`SessionManager`] - Start sessions from config, route intents by device
//! - [`PollScheduler`] - Interval ticks with cancellation
//!
//! ### Accessory Layer
//! - [`AccessorySink`] - Receives pushed state updates
//! - [`ChannelAccessory`] - Sink that forwards [`AccessoryEvent`]s over a channel
//!
//! ### Configuration
//! - [`config::load_config()`], [`config::validate_all()`] - `config.toml` handling

pub mod accessory;
pub mod config;
pub mod manager;
pub mod scheduler;
pub mod session;

pub use accessory::{AccessoryEvent, AccessorySink, AccessoryUpdate, ChannelAccessory};
pub use config::{DeviceConfig, SessionSettings, TvlinkConfig};
pub use manager::SessionManager;
pub use scheduler::PollScheduler;
pub use session::{spawn_session, DeviceSession, SessionHandle, SessionSnapshot};
