//! Device session - the state machine behind one television
//!
//! A session owns everything about one device: its adb connection, the last
//! observed [`DeviceState`], and the lifecycle [`SessionPhase`]. It is driven
//! by exactly one task (see [`super::handle`]), so no two operations on the
//! same device ever overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::accessory::AccessorySink;
use crate::config::{DeviceConfig, SessionSettings};
use tvlink_adb::output::DeviceEntryState;
use tvlink_adb::{
    parse_focused_source, parse_power, parse_product_info, AdbCommand, CommandRunner,
    ConnectionManager, FocusedApp, WakeOnLan, FOCUSED_WINDOW_QUERY, KEYCODE_SLEEP,
    KEYCODE_WAKEUP, POWER_STATE_QUERY, PRODUCT_INFO_QUERY,
};
use tvlink_core::prelude::*;
use tvlink_core::{
    AppDefinition, ConnectionState, DeviceIdentity, DeviceState, PowerState, ProductIdentity,
    SessionPhase, SourceDefinition, SourceId,
};

/// Point-in-time view of a session, for status output
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub device: DeviceIdentity,
    pub phase: SessionPhase,
    pub connection: ConnectionState,
    pub power: PowerState,
    pub active_source_id: Option<SourceId>,
    pub active_source_name: Option<String>,
    pub retry_count: u32,
    pub product: Option<ProductIdentity>,
    pub last_reconciled_at: Option<DateTime<Local>>,
    pub sources: Vec<SourceDefinition>,
    pub apps: Vec<AppDefinition>,
}

/// What one successful poll observed
struct Observation {
    power: bool,
    active_source_id: Option<SourceId>,
}

pub struct DeviceSession<R, W> {
    identity: DeviceIdentity,
    sources: Vec<SourceDefinition>,
    apps: Vec<AppDefinition>,
    interval: Duration,
    settings: SessionSettings,

    runner: R,
    wol: W,
    sink: Arc<dyn AccessorySink>,

    connection: ConnectionManager,
    state: DeviceState,
    phase: SessionPhase,
    product: Option<ProductIdentity>,
    last_reconciled_at: Option<DateTime<Local>>,
}

impl<R, W> std::fmt::Debug for DeviceSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("identity", &self.identity)
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("connection", &self.connection)
            .field("has_product", &self.product.is_some())
            .finish()
    }
}

impl<R, W> DeviceSession<R, W>
where
    R: CommandRunner + Sync,
    W: WakeOnLan + Sync,
{
    pub fn new(
        config: DeviceConfig,
        settings: SessionSettings,
        runner: R,
        wol: W,
        sink: Arc<dyn AccessorySink>,
    ) -> Self {
        let connection =
            ConnectionManager::new(config.identity.address.clone(), settings.command_timeout);
        Self {
            identity: config.identity,
            sources: config.sources,
            apps: config.apps,
            interval: config.interval,
            settings,
            runner,
            wol,
            sink,
            connection,
            state: DeviceState::default(),
            phase: SessionPhase::Uninitialized,
            product: None,
            last_reconciled_at: None,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn address(&self) -> &str {
        &self.identity.address
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn product(&self) -> Option<&ProductIdentity> {
        self.product.as_ref()
    }

    pub fn sources(&self) -> &[SourceDefinition] {
        &self.sources
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active_source_name = self
            .state
            .active_source_id
            .and_then(|id| self.source(id))
            .map(|s| s.name.clone());

        SessionSnapshot {
            device: self.identity.clone(),
            phase: self.phase,
            connection: self.connection.state(),
            power: self.state.power,
            active_source_id: self.state.active_source_id,
            active_source_name,
            retry_count: self.state.retry_count,
            product: self.product.clone(),
            last_reconciled_at: self.last_reconciled_at,
            sources: self.sources.clone(),
            apps: self.apps.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Connect and publish the product identity
    ///
    /// Never fails: problems leave the session `Degraded` and polling takes
    /// over. Failures here do not count towards the retry ceiling.
    pub async fn initialize(&mut self) {
        self.phase = SessionPhase::Initializing;
        info!(address = %self.identity.address, "Starting session for {}", self.identity.name);

        match self.connection.list_devices(&self.runner).await {
            Ok(devices) => {
                let address = self.identity.address.clone();
                for entry in devices.iter().filter(|e| e.matches_address(&address)) {
                    match &entry.state {
                        DeviceEntryState::Unauthorized => warn!(
                            address = %self.identity.address,
                            "Device is unauthorized. Accept the USB debugging prompt on the TV."
                        ),
                        DeviceEntryState::Offline => warn!(
                            address = %self.identity.address,
                            "Device is offline. Check that network debugging is enabled on the TV."
                        ),
                        _ => {}
                    }
                    self.connection.adopt(entry);
                }
            }
            Err(e) => {
                warn!(address = %self.identity.address, "Could not list adb devices: {}", e);
            }
        }

        if let Err(e) = self.connection.ensure_connected(&self.runner).await {
            self.degrade_during_init(&e);
            return;
        }

        if let Err(e) = self.fetch_identity().await {
            self.degrade_during_init(&e);
            return;
        }

        self.phase = SessionPhase::Ready;
        info!(address = %self.identity.address, "Session ready");
    }

    fn degrade_during_init(&mut self, err: &Error) {
        error!(
            address = %self.identity.address,
            "Initialization failed, will keep polling: {}", err
        );
        error!(
            address = %self.identity.address,
            "Please check the adb connection to this device manually"
        );
        self.phase = SessionPhase::Degraded;
    }

    // ─────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────

    /// One status poll: read power and the focused app, push both
    ///
    /// State is only committed when every command succeeded. Any failure
    /// counts towards the retry ceiling, and a failed shell command also
    /// forces a fresh adb session for the next cycle.
    pub async fn reconcile(&mut self) -> Result<()> {
        let observation = match self.observe().await {
            Ok(observation) => observation,
            Err(e) => {
                if e.is_command_error() {
                    if let Err(reset_err) = self.connection.reset(&self.runner).await {
                        debug!(address = %self.identity.address, "Reset after failed poll: {}", reset_err);
                    }
                }
                self.record_failure("Status poll", &e);
                return Err(e);
            }
        };

        if observation.active_source_id != self.state.active_source_id {
            if let Some(id) = observation.active_source_id {
                info!(
                    address = %self.identity.address,
                    "Active source is now {} ({})",
                    id,
                    self.source(id).map(|s| s.name.as_str()).unwrap_or("?")
                );
            }
        }

        self.state.power = PowerState::from(observation.power);
        self.state.active_source_id = observation.active_source_id;
        self.last_reconciled_at = Some(Local::now());
        self.record_success();

        self.sink.update_power(observation.power);
        if let Some(id) = observation.active_source_id {
            self.sink.update_active_source(id);
        }

        if self.product.is_none() {
            if let Err(e) = self.fetch_identity().await {
                debug!(address = %self.identity.address, "Product info still unavailable: {}", e);
            }
        }

        Ok(())
    }

    async fn observe(&mut self) -> Result<Observation> {
        self.connection.ensure_connected(&self.runner).await?;

        let power = parse_power(&self.shell(POWER_STATE_QUERY).await?);
        let mut active_source_id = self.state.active_source_id;

        if power {
            let output = self.shell(FOCUSED_WINDOW_QUERY).await?;
            match parse_focused_source(&output, &self.settings.launcher_activities) {
                Ok(focused) => {
                    if let Some(id) = self.map_focused(&focused) {
                        active_source_id = Some(id);
                    }
                }
                Err(e) => {
                    debug!(address = %self.identity.address, "Focused window not recognised: {}", e);
                }
            }
        }

        Ok(Observation {
            power,
            active_source_id,
        })
    }

    /// Map a focused app onto a configured source
    fn map_focused(&self, focused: &FocusedApp) -> Option<SourceId> {
        match focused {
            FocusedApp::Launcher => self.default_source().map(|s| s.id),
            FocusedApp::Package(package) => {
                let source = self
                    .sources
                    .iter()
                    .find(|s| s.package.as_deref() == Some(package.as_str()));
                if source.is_none() {
                    debug!(
                        address = %self.identity.address,
                        package = %package,
                        "Focused app does not match any configured source"
                    );
                }
                source.map(|s| s.id)
            }
        }
    }

    /// The source marked `default`, else the first configured one
    fn default_source(&self) -> Option<&SourceDefinition> {
        self.sources
            .iter()
            .find(|s| s.is_default)
            .or_else(|| self.sources.first())
    }

    fn source(&self, id: SourceId) -> Option<&SourceDefinition> {
        self.sources.iter().find(|s| s.id == id)
    }

    async fn fetch_identity(&mut self) -> Result<()> {
        let output = self.shell(PRODUCT_INFO_QUERY).await?;
        let mut product = parse_product_info(&output)?;
        if product.serial.is_none() {
            product.serial = Some(self.identity.address.clone());
        }

        info!(
            address = %self.identity.address,
            "{} {} (serial {})",
            product.manufacturer,
            product.model,
            product.serial_or(&self.identity.address)
        );

        self.sink.publish_identity(&product);
        self.product = Some(product);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Intents
    // ─────────────────────────────────────────────────────────────

    /// Turn the TV on (wake-on-LAN then `KEYCODE_WAKEUP`) or off (`KEYCODE_SLEEP`)
    pub async fn set_power(&mut self, on: bool) -> Result<()> {
        if on {
            self.power_on().await
        } else {
            self.power_off().await
        }
    }

    async fn power_on(&mut self) -> Result<()> {
        info!(address = %self.identity.address, "Power on requested");

        let Some(mac) = self.identity.mac else {
            warn!(address = %self.identity.address, "No MAC address configured, cannot wake");
            self.state.power = PowerState::Off;
            self.sink.update_power(false);
            return Err(Error::MacNotConfigured {
                name: self.identity.name.clone(),
            });
        };

        if !self.wol.send_magic_packet(mac).await {
            error!(address = %self.identity.address, %mac, "Wake-on-LAN failed");
            self.state.power = PowerState::Off;
            self.sink.update_power(false);
            return Err(Error::wake_on_lan(mac.to_string()));
        }

        match self.send_keys(&[KEYCODE_WAKEUP]).await {
            Ok(()) => {
                info!(address = %self.identity.address, "Device is awake");
                if let Some(id) = self.state.active_source_id {
                    self.sink.update_active_source(id);
                }
                self.state.power = PowerState::On;
                self.sink.update_power(true);
                self.record_success();
                Ok(())
            }
            Err(e) => {
                self.state.power = PowerState::Off;
                self.sink.update_power(false);
                self.record_failure("Power on", &e);
                Err(e)
            }
        }
    }

    async fn power_off(&mut self) -> Result<()> {
        info!(address = %self.identity.address, "Power off requested");

        match self.send_keys(&[KEYCODE_SLEEP]).await {
            Ok(()) => {
                info!(address = %self.identity.address, "Sleeping");
                self.state.power = PowerState::Off;
                self.sink.update_power(false);
                self.record_success();
                Ok(())
            }
            Err(e) => {
                // tell the accessory the TV is still in its last known state
                if let Some(on) = self.state.power.as_bool() {
                    self.sink.update_power(on);
                }
                self.record_failure("Power off", &e);
                Err(e)
            }
        }
    }

    /// Switch input: wake key-event then the source's own key-event
    ///
    /// With `optimistic_source` the id is recorded before any command runs
    /// and kept even if a key-event fails.
    pub async fn set_source(&mut self, id: SourceId) -> Result<()> {
        let Some(source) = self.source(id).cloned() else {
            warn!(address = %self.identity.address, "No source with id {}", id);
            return Err(Error::SourceNotFound { id });
        };

        info!(address = %self.identity.address, "Switching to {} ({})", source.name, source.key_code);

        if self.settings.optimistic_source {
            self.state.active_source_id = Some(id);
        }

        match self.send_keys(&[KEYCODE_WAKEUP, source.key_code.as_str()]).await {
            Ok(()) => {
                self.state.active_source_id = Some(id);
                self.record_success();
                self.sink.update_active_source(id);
                Ok(())
            }
            Err(e) => {
                self.record_failure("Source switch", &e);
                Err(e)
            }
        }
    }

    /// Ensure a connection then send each key-event in order, stopping at the
    /// first failure
    async fn send_keys(&mut self, codes: &[&str]) -> Result<()> {
        self.connection.ensure_connected(&self.runner).await?;

        for &code in codes {
            let command = AdbCommand::key_event(self.address(), code);
            if let Err(e) = self.runner.run(&command, self.settings.command_timeout).await {
                error!(address = %self.identity.address, "{} failed: {}", command, e);
                self.connection.mark_disconnected();
                return Err(e);
            }
            debug!(address = %self.identity.address, "Sent {}", code);
        }
        Ok(())
    }

    async fn shell(&self, command: &str) -> Result<String> {
        self.runner
            .run(
                &AdbCommand::shell(self.address(), command),
                self.settings.command_timeout,
            )
            .await
    }

    // ─────────────────────────────────────────────────────────────
    // Retry accounting
    // ─────────────────────────────────────────────────────────────

    fn record_success(&mut self) {
        if self.state.retry_count > 0 {
            info!(
                address = %self.identity.address,
                "Recovered after {} failed attempts", self.state.retry_count
            );
        }
        self.state.retry_count = 0;
        if self.phase != SessionPhase::Stopped {
            self.phase = SessionPhase::Ready;
        }
    }

    fn record_failure(&mut self, operation: &str, err: &Error) {
        self.state.retry_count = self.state.retry_count.saturating_add(1);
        warn!(
            address = %self.identity.address,
            retries = self.state.retry_count,
            "{} failed: {}", operation, err
        );

        if self.phase == SessionPhase::Stopped {
            return;
        }

        if self.state.retry_count >= self.settings.retry_limit {
            error!(
                address = %self.identity.address,
                "Giving up polling after {} consecutive failures", self.state.retry_count
            );
            self.phase = SessionPhase::Stopped;
        } else {
            self.phase = SessionPhase::Degraded;
        }
    }
}
