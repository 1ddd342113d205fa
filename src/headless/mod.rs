//! Headless mode - NDJSON bridge to the accessory layer
//!
//! Device state is written to stdout as newline-delimited JSON, one event per
//! line. Intents are read from stdin, also one JSON object per line.
//!
//! # Event Format
//!
//! ```json
//! {"event":"session_started","device":"Living Room","address":"192.168.1.20","timestamp":1704700001000}
//! {"event":"power","device":"Living Room","on":true,"timestamp":1704700002000}
//! {"event":"active_source","device":"Living Room","id":1,"timestamp":1704700002001}
//! ```
//!
//! # Intent Format
//!
//! ```json
//! {"device":"Living Room","intent":"power","on":false}
//! {"intent":"source","id":2}
//! ```

pub mod intent;
pub mod runner;

use chrono::Utc;
use serde::Serialize;
use std::io::{self, Write};
use tracing::error;

use tvlink_app::{AccessoryEvent, AccessoryUpdate, SessionSnapshot};
use tvlink_core::SourceId;

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// A device session was started
    SessionStarted {
        device: String,
        address: String,
        timestamp: i64,
    },

    /// Screen power changed or was confirmed
    Power {
        device: String,
        on: bool,
        timestamp: i64,
    },

    /// Active input source
    ActiveSource {
        device: String,
        id: SourceId,
        timestamp: i64,
    },

    /// Product information read from the device
    Identity {
        device: String,
        model: String,
        manufacturer: String,
        serial: Option<String>,
        timestamp: i64,
    },

    /// Outcome of an intent read from stdin
    IntentResult {
        device: Option<String>,
        intent: String,
        ok: bool,
        error: Option<String>,
        timestamp: i64,
    },

    /// Current state of every session
    Status {
        sessions: Vec<SessionSnapshot>,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn session_started(device: &str, address: &str) -> Self {
        Self::SessionStarted {
            device: device.to_string(),
            address: address.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn intent_result(device: Option<String>, intent: &str, result: &tvlink_core::Result<()>) -> Self {
        Self::IntentResult {
            device,
            intent: intent.to_string(),
            ok: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp: Self::now(),
        }
    }

    pub fn status(sessions: Vec<SessionSnapshot>) -> Self {
        Self::Status {
            sessions,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

impl From<AccessoryEvent> for HeadlessEvent {
    fn from(event: AccessoryEvent) -> Self {
        let device = event.device;
        let timestamp = Self::now();
        match event.update {
            AccessoryUpdate::Power { on } => Self::Power {
                device,
                on,
                timestamp,
            },
            AccessoryUpdate::ActiveSource { id } => Self::ActiveSource {
                device,
                id,
                timestamp,
            },
            AccessoryUpdate::Identity { identity } => Self::Identity {
                device,
                model: identity.model,
                manufacturer: identity.manufacturer,
                serial: identity.serial,
                timestamp,
            },
        }
    }
}
