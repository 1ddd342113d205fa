//! Application error types with rich context

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Command Errors (adb process execution)
    // ─────────────────────────────────────────────────────────────
    #[error("adb executable not found. Install platform-tools or set [adb] path.")]
    AdbNotFound,

    #[error("Failed to execute `{command}`: {message}")]
    CommandExec { command: String, message: String },

    #[error("`{command}` timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("`{command}` exited with code {code:?}: {stderr}")]
    CommandExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Connection Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to connect to {address}: {output}")]
    ConnectionFailed { address: String, output: String },

    #[error("Unexpected connect output from {address}: {output}")]
    ConnectionAmbiguous { address: String, output: String },

    #[error("Failed to reset connection to {address}: {message}")]
    ConnectionReset { address: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Output Parsing Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse device output: {message}")]
    Parse { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Session Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No source with id {id} is configured")]
    SourceNotFound { id: u32 },

    #[error("Wake-on-LAN to {mac} failed")]
    WakeOnLan { mac: String },

    #[error("No MAC address configured for {name}, cannot wake it")]
    MacNotConfigured { name: String },

    #[error("No device named {name}")]
    DeviceNotFound { name: String },

    #[error("Device session has shut down")]
    SessionClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn command_exec(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandExec {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn command_timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::CommandTimeout {
            command: command.into(),
            timeout,
        }
    }

    pub fn command_exit(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandExit {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    pub fn connection_failed(address: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            address: address.into(),
            output: output.into(),
        }
    }

    pub fn connection_ambiguous(address: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ConnectionAmbiguous {
            address: address.into(),
            output: output.into(),
        }
    }

    pub fn connection_reset(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionReset {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn wake_on_lan(mac: impl Into<String>) -> Self {
        Self::WakeOnLan { mac: mac.into() }
    }

    /// True for failures of the adb process itself
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Error::AdbNotFound
                | Error::CommandExec { .. }
                | Error::CommandTimeout { .. }
                | Error::CommandExit { .. }
        )
    }

    /// True for failures to establish or repair the adb transport
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed { .. }
                | Error::ConnectionAmbiguous { .. }
                | Error::ConnectionReset { .. }
        )
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the session running; a later successful
    /// cycle clears them.
    pub fn is_recoverable(&self) -> bool {
        self.is_command_error()
            || self.is_connection_error()
            || matches!(
                self,
                Error::Parse { .. }
                    | Error::SourceNotFound { .. }
                    | Error::WakeOnLan { .. }
            )
    }

    /// Check if this error prevents a device session from being constructed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ConfigNotFound { .. } | Error::ConfigInvalid { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
