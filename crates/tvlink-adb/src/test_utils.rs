//! Test utilities for adb-driven code
//!
//! [`FakeRunner`] answers commands from scripted replies and records every
//! command it saw, so session logic can be exercised without a device.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::commands::{
    AdbCommand, FOCUSED_WINDOW_QUERY, POWER_STATE_QUERY, PRODUCT_INFO_QUERY,
};
use crate::runner::CommandRunner;
use crate::wol::WakeOnLan;
use tvlink_core::prelude::*;
use tvlink_core::MacAddress;

/// Scripted result for a matching command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeReply {
    /// Succeeds with this stdout
    Ok(String),
    /// Exits non-zero with this diagnostic
    Fail(String),
    /// Exceeds the command timeout
    Timeout,
}

impl FakeReply {
    pub fn ok(output: impl Into<String>) -> Self {
        Self::Ok(output.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

#[derive(Debug, Default)]
struct Script {
    /// Sticky rules; the last matching rule wins
    rules: Vec<(String, FakeReply)>,
    /// One-shot replies, consumed in order before sticky rules are consulted
    queued: VecDeque<(String, FakeReply)>,
    history: Vec<AdbCommand>,
}

/// In-memory [`CommandRunner`]
///
/// Patterns match by substring against the command's display form, e.g.
/// `adb connect` or `input keyevent KEYCODE_SLEEP`. Unmatched commands fail.
/// Clones share the same script and history.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    script: Arc<Mutex<Script>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner scripted as a reachable TV: connect succeeds, screen on,
    /// the launcher focused, product info available
    pub fn reachable_tv() -> Self {
        Self::new()
            .on("adb devices", FakeReply::ok("List of devices attached\n"))
            .on("adb disconnect", FakeReply::ok("disconnected"))
            .on("adb connect", FakeReply::ok("connected"))
            .on(PRODUCT_INFO_QUERY, FakeReply::ok("55OLED806/12\nPhilips\nFZ1A2345678"))
            .on(POWER_STATE_QUERY, FakeReply::ok("true"))
            .on(
                FOCUSED_WINDOW_QUERY,
                FakeReply::ok(
                    "mFocusedApp=ActivityRecord{8b7b1ad u0 com.google.android.tvlauncher/.MainActivity t1}",
                ),
            )
            .on("input keyevent", FakeReply::ok(""))
    }

    /// Add a sticky rule, overriding earlier rules for the same commands
    pub fn on(self, pattern: impl Into<String>, reply: FakeReply) -> Self {
        self.set(pattern, reply);
        self
    }

    /// Add or replace a sticky rule on a shared runner
    pub fn set(&self, pattern: impl Into<String>, reply: FakeReply) {
        if let Ok(mut script) = self.script.lock() {
            script.rules.push((pattern.into(), reply));
        }
    }

    /// Queue a reply used once by the next matching command
    pub fn once(&self, pattern: impl Into<String>, reply: FakeReply) {
        if let Ok(mut script) = self.script.lock() {
            script.queued.push_back((pattern.into(), reply));
        }
    }

    /// Every command run so far, oldest first
    pub fn history(&self) -> Vec<AdbCommand> {
        self.script
            .lock()
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    /// Number of recorded commands whose display form contains `pattern`
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.history()
            .iter()
            .filter(|cmd| cmd.to_string().contains(pattern))
            .count()
    }

    pub fn clear_history(&self) {
        if let Ok(mut script) = self.script.lock() {
            script.history.clear();
        }
    }

    fn reply_for(&self, command: &AdbCommand) -> FakeReply {
        let description = command.to_string();
        let Ok(mut script) = self.script.lock() else {
            return FakeReply::fail("script poisoned");
        };
        script.history.push(command.clone());

        if let Some(pos) = script
            .queued
            .iter()
            .position(|(pattern, _)| description.contains(pattern.as_str()))
        {
            if let Some((_, reply)) = script.queued.remove(pos) {
                return reply;
            }
        }

        script
            .rules
            .iter()
            .rev()
            .find(|(pattern, _)| description.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| FakeReply::fail(format!("no scripted reply for {}", description)))
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, command: &AdbCommand, timeout: Duration) -> Result<String> {
        match self.reply_for(command) {
            FakeReply::Ok(output) => Ok(output.trim().to_string()),
            FakeReply::Fail(message) => Err(Error::command_exit(command.to_string(), Some(1), message)),
            FakeReply::Timeout => Err(Error::command_timeout(command.to_string(), timeout)),
        }
    }
}

/// In-memory [`WakeOnLan`] that counts packets
#[derive(Debug, Clone)]
pub struct FakeWakeOnLan {
    reply: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeWakeOnLan {
    /// Packets are reported as sent
    pub fn working() -> Self {
        Self {
            reply: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Packets are reported as not sent
    pub fn broken() -> Self {
        Self {
            reply: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WakeOnLan for FakeWakeOnLan {
    async fn send_magic_packet(&self, _mac: MacAddress) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
    }
}
