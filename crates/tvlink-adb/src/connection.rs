//! adb transport session management for one device address

use std::time::Duration;

use crate::commands::AdbCommand;
use crate::output::{parse_device_list, DeviceEntry};
use crate::runner::CommandRunner;
use tvlink_core::prelude::*;
use tvlink_core::ConnectionState;

/// How `adb connect` output was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    Failed,
    /// Neither the failure nor the success token
    Ambiguous,
}

/// Classify `adb connect` output
///
/// adb reports most connect failures on stdout with a zero exit code, so the
/// text is all we have. `failed` is checked first because
/// "failed to connect" also contains "connect".
pub fn classify_connect_output(output: &str) -> ConnectOutcome {
    let lower = output.to_lowercase();
    if lower.contains("failed") {
        ConnectOutcome::Failed
    } else if lower.contains("connected") {
        ConnectOutcome::Connected
    } else {
        ConnectOutcome::Ambiguous
    }
}

/// Whether `adb disconnect` output confirms the session was dropped
pub fn is_disconnect_confirmed(output: &str) -> bool {
    output.to_lowercase().contains("disconnected")
}

/// Establishes and repairs the adb session to a single device address
///
/// Tracks its own retry counter: connect failures increment it, a confirmed
/// connection resets it.
#[derive(Debug)]
pub struct ConnectionManager {
    address: String,
    state: ConnectionState,
    retries: u32,
    command_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(address: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            state: ConnectionState::Disconnected,
            retries: 0,
            command_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Record that the session is known to be stale; the next
    /// [`ensure_connected`](Self::ensure_connected) reconnects.
    pub fn mark_disconnected(&mut self) {
        if self.state == ConnectionState::Connected {
            debug!(address = %self.address, "Marking adb session as disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Adopt an existing adb session (found in `adb devices`) without reconnecting
    pub fn adopt(&mut self, entry: &DeviceEntry) {
        if entry.matches_address(&self.address) && entry.is_usable() {
            debug!(address = %self.address, serial = %entry.serial, "Adopting existing adb session");
            self.state = ConnectionState::Connected;
            self.retries = 0;
        }
    }

    /// Make sure an adb session to the device exists
    ///
    /// No-op when already connected. Otherwise runs disconnect-then-connect
    /// once; a failing disconnect is expected for a severed session and is
    /// only logged.
    pub async fn ensure_connected<R: CommandRunner + Sync>(&mut self, runner: &R) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        info!(
            address = %self.address,
            attempt = self.retries + 1,
            "Connecting to device"
        );

        if let Err(e) = self.disconnect(runner).await {
            debug!(address = %self.address, "Disconnect before connect failed: {}", e);
        }

        self.connect(runner).await
    }

    /// Force a fresh session after a command failed on a stale one
    ///
    /// Disconnects, and only when the disconnect is confirmed attempts a new
    /// connect. The command that failed is not retried here.
    pub async fn reset<R: CommandRunner + Sync>(&mut self, runner: &R) -> Result<()> {
        self.state = ConnectionState::Disconnected;

        match self.disconnect(runner).await {
            Ok(true) => self.connect(runner).await,
            Ok(false) => {
                let err = Error::connection_reset(&self.address, "disconnect was not confirmed");
                warn!(address = %self.address, "{}", err);
                Err(err)
            }
            Err(e) => {
                let err = Error::connection_reset(&self.address, e.to_string());
                warn!(address = %self.address, "{}", err);
                Err(err)
            }
        }
    }

    /// List devices known to the local adb server
    pub async fn list_devices<R: CommandRunner + Sync>(&self, runner: &R) -> Result<Vec<DeviceEntry>> {
        let output = runner
            .run(&AdbCommand::Devices, self.command_timeout)
            .await?;
        Ok(parse_device_list(&output))
    }

    /// Run `adb disconnect`, returning whether it was confirmed
    async fn disconnect<R: CommandRunner + Sync>(&self, runner: &R) -> Result<bool> {
        let output = runner
            .run(&AdbCommand::disconnect(&self.address), self.command_timeout)
            .await?;
        debug!(address = %self.address, "adb disconnect: {}", output);
        Ok(is_disconnect_confirmed(&output))
    }

    async fn connect<R: CommandRunner + Sync>(&mut self, runner: &R) -> Result<()> {
        let output = match runner
            .run(&AdbCommand::connect(&self.address), self.command_timeout)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                self.retries += 1;
                self.state = ConnectionState::Disconnected;
                let err = match e {
                    Error::CommandExit { stderr, .. } => Error::connection_failed(&self.address, stderr),
                    other => Error::connection_failed(&self.address, other.to_string()),
                };
                error!(address = %self.address, retries = self.retries, "{}", err);
                return Err(err);
            }
        };

        match classify_connect_output(&output) {
            ConnectOutcome::Connected => {
                info!(address = %self.address, "Connected: {}", output);
                self.state = ConnectionState::Connected;
                self.retries = 0;
                Ok(())
            }
            ConnectOutcome::Failed => {
                self.retries += 1;
                self.state = ConnectionState::Disconnected;
                error!(address = %self.address, retries = self.retries, "adb connect failed: {}", output);
                Err(Error::connection_failed(&self.address, output))
            }
            ConnectOutcome::Ambiguous => {
                self.retries += 1;
                self.state = ConnectionState::Disconnected;
                error!(
                    address = %self.address,
                    retries = self.retries,
                    "Unexpected adb connect output: {}",
                    output
                );
                // drop whatever half-open session adb may be holding
                if let Err(e) = self.disconnect(runner).await {
                    debug!(address = %self.address, "Cleanup disconnect failed: {}", e);
                }
                Err(Error::connection_ambiguous(&self.address, output))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeReply, FakeRunner};

    const ADDR: &str = "192.168.1.20";

    fn manager() -> ConnectionManager {
        ConnectionManager::new(ADDR, Duration::from_secs(1))
    }

    #[test]
    fn test_classify_connect_output() {
        assert_eq!(
            classify_connect_output("connected to 192.168.1.20:5555"),
            ConnectOutcome::Connected
        );
        assert_eq!(
            classify_connect_output("already connected to 192.168.1.20:5555"),
            ConnectOutcome::Connected
        );
        assert_eq!(
            classify_connect_output("failed to connect to '192.168.1.20:5555': Connection refused"),
            ConnectOutcome::Failed
        );
        assert_eq!(
            classify_connect_output("unable to resolve host"),
            ConnectOutcome::Ambiguous
        );
        assert_eq!(classify_connect_output(""), ConnectOutcome::Ambiguous);
    }

    #[test]
    fn test_disconnect_confirmation() {
        assert!(is_disconnect_confirmed("disconnected 192.168.1.20"));
        assert!(!is_disconnect_confirmed("error: no such device '192.168.1.20:5555'"));
    }

    #[tokio::test]
    async fn test_ensure_connected_success_resets_retries() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::fail("error: no such device"))
            .on("adb connect", FakeReply::ok("connected to 192.168.1.20:5555"));
        let mut conn = manager();

        conn.ensure_connected(&runner).await.unwrap();

        assert!(conn.is_connected());
        assert_eq!(conn.retries(), 0);
        // disconnect failure was ignored, connect followed
        assert_eq!(runner.count_matching("adb disconnect"), 1);
        assert_eq!(runner.count_matching("adb connect"), 1);
    }

    #[tokio::test]
    async fn test_ensure_connected_is_noop_when_connected() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("disconnected 192.168.1.20"))
            .on("adb connect", FakeReply::ok("connected to 192.168.1.20:5555"));
        let mut conn = manager();

        conn.ensure_connected(&runner).await.unwrap();
        conn.ensure_connected(&runner).await.unwrap();

        assert_eq!(runner.count_matching("adb connect"), 1);
    }

    #[tokio::test]
    async fn test_failed_token_increments_retries() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("disconnected 192.168.1.20"))
            .on(
                "adb connect",
                FakeReply::ok("failed to connect to '192.168.1.20:5555': No route to host"),
            );
        let mut conn = manager();

        let err = conn.ensure_connected(&runner).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed { .. }));
        assert_eq!(conn.retries(), 1);

        conn.ensure_connected(&runner).await.unwrap_err();
        assert_eq!(conn.retries(), 2);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_ambiguous_output_increments_retries_and_disconnects() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("disconnected 192.168.1.20"))
            .on("adb connect", FakeReply::ok("something odd happened"));
        let mut conn = manager();

        let err = conn.ensure_connected(&runner).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionAmbiguous { .. }));
        assert_eq!(conn.retries(), 1);
        // one before connect, one cleanup after
        assert_eq!(runner.count_matching("adb disconnect"), 2);
    }

    #[tokio::test]
    async fn test_connect_exec_error_counts_as_failure() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("disconnected 192.168.1.20"))
            .on("adb connect", FakeReply::Timeout);
        let mut conn = manager();

        let err = conn.ensure_connected(&runner).await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(conn.retries(), 1);
    }

    #[tokio::test]
    async fn test_reset_reconnects_after_confirmed_disconnect() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("disconnected 192.168.1.20"))
            .on("adb connect", FakeReply::ok("connected to 192.168.1.20:5555"));
        let mut conn = manager();
        conn.ensure_connected(&runner).await.unwrap();
        runner.clear_history();

        conn.reset(&runner).await.unwrap();

        assert!(conn.is_connected());
        assert_eq!(runner.count_matching("adb disconnect"), 1);
        assert_eq!(runner.count_matching("adb connect"), 1);
    }

    #[tokio::test]
    async fn test_reset_without_confirmation_does_not_connect() {
        let runner = FakeRunner::new()
            .on("adb disconnect", FakeReply::ok("error: no such device"))
            .on("adb connect", FakeReply::ok("connected to 192.168.1.20:5555"));
        let mut conn = manager();

        let err = conn.reset(&runner).await.unwrap_err();

        assert!(matches!(err, Error::ConnectionReset { .. }));
        assert!(!conn.is_connected());
        assert_eq!(runner.count_matching("adb connect"), 0);
    }

    #[tokio::test]
    async fn test_adopt_existing_session() {
        let runner = FakeRunner::new().on(
            "adb devices",
            FakeReply::ok("List of devices attached\n192.168.1.20:5555\tdevice\n"),
        );
        let mut conn = manager();

        let devices = conn.list_devices(&runner).await.unwrap();
        for entry in &devices {
            conn.adopt(entry);
        }

        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_adopt_ignores_unauthorized_entry() {
        let mut conn = manager();
        conn.adopt(&DeviceEntry {
            serial: "192.168.1.20:5555".to_string(),
            state: crate::output::DeviceEntryState::Unauthorized,
        });
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_mark_disconnected() {
        let mut conn = manager();
        conn.state = ConnectionState::Connected;
        conn.mark_disconnected();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
