//! Manages the sessions of every configured device

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::accessory::AccessorySink;
use crate::config::{validate_all, DeviceConfig, TvlinkConfig};
use crate::session::{spawn_session, DeviceSession, SessionHandle, SessionSnapshot};
use tvlink_adb::{CommandRunner, WakeOnLan};
use tvlink_core::prelude::*;
use tvlink_core::SourceId;

/// Running sessions, in configuration order
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Vec<SessionHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every accessory entry and start a session for each valid one
    ///
    /// Invalid entries are logged and skipped; the rest still start.
    /// `make_sink` builds the accessory sink for each device.
    pub fn start_all<R, W, F>(config: &TvlinkConfig, runner: R, wol: W, make_sink: F) -> Self
    where
        R: CommandRunner + Sync + Clone + 'static,
        W: WakeOnLan + Sync + Clone + 'static,
        F: Fn(&DeviceConfig) -> Arc<dyn AccessorySink>,
    {
        let mut manager = Self::new();

        if config.accessories.is_empty() {
            info!("Please add one or more accessories in your config");
            return manager;
        }

        let settings = config.adb.session_settings();

        for (index, result) in validate_all(config).into_iter().enumerate() {
            let device = match result {
                Ok(device) => device,
                Err(e) => {
                    error!("Skipping accessory #{}: {}", index + 1, e);
                    continue;
                }
            };

            if manager.find(&device.identity.name).is_some() {
                warn!(
                    "Accessory name {:?} is used more than once; use the address to address it",
                    device.identity.name
                );
            }

            let sink = make_sink(&device);
            let session = DeviceSession::new(device, settings.clone(), runner.clone(), wol.clone(), sink);
            manager.add(spawn_session(session));
        }

        info!("Started {} device session(s)", manager.len());
        manager
    }

    pub fn add(&mut self, (handle, task): (SessionHandle, JoinHandle<()>)) {
        self.sessions.push(handle);
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &SessionHandle> {
        self.sessions.iter()
    }

    /// Find a session by device name or address
    pub fn find(&self, key: &str) -> Option<&SessionHandle> {
        self.sessions
            .iter()
            .find(|h| h.name() == key || h.address() == key)
    }

    /// Resolve an intent target; `None` is accepted when only one device runs
    pub fn resolve(&self, key: Option<&str>) -> Result<&SessionHandle> {
        match key {
            Some(key) => self.find(key).ok_or_else(|| Error::DeviceNotFound {
                name: key.to_string(),
            }),
            None if self.sessions.len() == 1 => Ok(&self.sessions[0]),
            None => Err(Error::DeviceNotFound {
                name: "(no device given)".to_string(),
            }),
        }
    }

    pub async fn set_power(&self, device: Option<&str>, on: bool) -> Result<()> {
        self.resolve(device)?.set_power(on).await
    }

    pub async fn set_source(&self, device: Option<&str>, id: SourceId) -> Result<()> {
        self.resolve(device)?.set_source(id).await
    }

    /// Reconcile every session once, logging failures
    pub async fn refresh_all(&self) {
        for handle in &self.sessions {
            if let Err(e) = handle.refresh().await {
                warn!(address = %handle.address(), "Refresh failed: {}", e);
            }
        }
    }

    /// Snapshots of all sessions still running
    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.sessions.len());
        for handle in &self.sessions {
            match handle.snapshot().await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => debug!(address = %handle.address(), "No snapshot: {}", e),
            }
        }
        snapshots
    }

    /// Shut every session down and wait for the tasks to finish
    pub async fn shutdown(self) {
        for handle in &self.sessions {
            if let Err(e) = handle.shutdown().await {
                debug!(address = %handle.address(), "Shutdown: {}", e);
            }
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::ChannelAccessory;
    use crate::config::AccessoryConfig;
    use tokio::sync::mpsc;
    use tvlink_adb::test_utils::{FakeRunner, FakeWakeOnLan};
    use tvlink_core::SourceDefinition;

    fn accessory(name: &str, address: Option<&str>) -> AccessoryConfig {
        AccessoryConfig {
            name: Some(name.to_string()),
            address: address.map(str::to_string),
            mac: Some("AA:BB:CC:DD:EE:FF".to_string()),
            interval: Some(60_000),
            sources: vec![SourceDefinition::new(1, "HDMI 1", "KEYCODE_F1")],
            apps: vec![],
        }
    }

    fn start(config: &TvlinkConfig) -> SessionManager {
        let (tx, _rx) = mpsc::unbounded_channel();
        SessionManager::start_all(
            config,
            FakeRunner::reachable_tv(),
            FakeWakeOnLan::working(),
            move |device| Arc::new(ChannelAccessory::new(device.identity.name.clone(), tx.clone())),
        )
    }

    #[tokio::test]
    async fn test_empty_accessory_list_starts_nothing() {
        let manager = start(&TvlinkConfig::default());
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entries_are_skipped() {
        let config = TvlinkConfig {
            accessories: vec![
                accessory("Broken", None),
                accessory("Living Room", Some("192.168.1.20")),
            ],
            ..Default::default()
        };
        let manager = start(&config);

        assert_eq!(manager.len(), 1);
        assert!(manager.find("Broken").is_none());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_routing_by_name_and_address() {
        let config = TvlinkConfig {
            accessories: vec![
                accessory("Living Room", Some("192.168.1.20")),
                accessory("Bedroom", Some("192.168.1.21")),
            ],
            ..Default::default()
        };
        let manager = start(&config);

        assert_eq!(manager.find("Bedroom").unwrap().address(), "192.168.1.21");
        assert_eq!(manager.find("192.168.1.20").unwrap().name(), "Living Room");
        assert!(matches!(
            manager.resolve(None),
            Err(Error::DeviceNotFound { .. })
        ));
        assert!(matches!(
            manager.set_power(Some("Kitchen"), true).await,
            Err(Error::DeviceNotFound { .. })
        ));

        manager.set_source(Some("Bedroom"), 1).await.unwrap();
        let snapshots = manager.snapshots().await;
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].active_source_id, Some(1));
        assert_eq!(snapshots[0].active_source_id, None);

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_device_needs_no_target() {
        let config = TvlinkConfig {
            accessories: vec![accessory("Living Room", Some("192.168.1.20"))],
            ..Default::default()
        };
        let manager = start(&config);

        assert_eq!(manager.resolve(None).unwrap().name(), "Living Room");
        manager.shutdown().await;
    }
}
