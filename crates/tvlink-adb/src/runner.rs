//! adb process execution
//!
//! [`CommandRunner`] is the single place where an adb invocation turns into a
//! `Result`: trimmed stdout on success, a command error otherwise. Retrying is
//! left to callers.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::commands::AdbCommand;
use crate::tool::AdbTool;
use tvlink_core::prelude::*;

/// Default upper bound for a single adb invocation
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes adb commands
///
/// Implementations must enforce `timeout`; a stalled device must not block
/// the caller forever.
#[trait_variant::make(CommandRunner: Send)]
pub trait LocalCommandRunner {
    /// Run `command`, returning its trimmed standard output
    async fn run(&self, command: &AdbCommand, timeout: Duration) -> Result<String>;
}

/// Runs commands through a local adb executable
#[derive(Debug, Clone)]
pub struct AdbRunner {
    adb_path: PathBuf,
}

impl AdbRunner {
    pub fn new(adb_path: impl Into<PathBuf>) -> Self {
        Self {
            adb_path: adb_path.into(),
        }
    }

    pub fn from_tool(tool: &AdbTool) -> Self {
        Self::new(tool.path.clone())
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }
}

impl CommandRunner for AdbRunner {
    async fn run(&self, command: &AdbCommand, timeout_duration: Duration) -> Result<String> {
        let description = command.to_string();
        trace!("Running {}", description);

        let output = timeout(
            timeout_duration,
            Command::new(&self.adb_path)
                .args(command.args())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true) // the timed-out child dies with the future
                .output(),
        )
        .await
        .map_err(|_| Error::command_timeout(&description, timeout_duration))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::AdbNotFound
            } else {
                Error::command_exec(&description, e.to_string())
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stderr.is_empty() {
            debug!("{} stderr: {}", description, stderr);
        }

        if !output.status.success() {
            // adb prints some failures on stdout
            let diagnostic = if stderr.is_empty() { stdout } else { stderr };
            return Err(Error::command_exit(
                description,
                output.status.code(),
                diagnostic,
            ));
        }

        trace!("{} stdout: {}", description, stdout);
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::{AdbRunner, CommandRunner};
    use crate::commands::AdbCommand;
    use std::time::Duration;
    use tvlink_core::Error;

    #[tokio::test]
    async fn test_missing_executable_is_adb_not_found() {
        let runner = AdbRunner::new("/nonexistent/path/to/adb");
        let result = runner
            .run(&AdbCommand::Devices, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(Error::AdbNotFound)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_carries_diagnostic() {
        // `false` ignores its arguments and exits 1
        let runner = AdbRunner::new("false");
        let result = runner
            .run(&AdbCommand::Devices, Duration::from_secs(5))
            .await;
        match result {
            Err(Error::CommandExit { command, code, .. }) => {
                assert_eq!(command, "adb devices");
                assert_eq!(code, Some(1));
            }
            other => panic!("expected CommandExit, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        // `echo devices` stands in for adb
        let runner = AdbRunner::new("echo");
        let out = runner
            .run(&AdbCommand::Devices, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "devices");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stalled_command_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("adb");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = AdbRunner::new(&script);
        let result = runner
            .run(&AdbCommand::Devices, Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(Error::CommandTimeout { .. })));
    }
}
