//! The accessory layer as seen from a session
//!
//! Sessions push state out through [`AccessorySink`] and never wait on it.

use serde::Serialize;
use tokio::sync::mpsc;
use tvlink_core::{ProductIdentity, SourceId};

/// Receives state updates for one device
#[cfg_attr(test, mockall::automock)]
pub trait AccessorySink: Send + Sync {
    fn update_power(&self, on: bool);

    fn update_active_source(&self, id: SourceId);

    /// Called once, the first time the product identity is known
    fn publish_identity(&self, identity: &ProductIdentity);
}

/// A single pushed update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AccessoryUpdate {
    Power { on: bool },
    ActiveSource { id: SourceId },
    Identity { identity: ProductIdentity },
}

/// An update tagged with the device it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessoryEvent {
    pub device: String,
    #[serde(flatten)]
    pub update: AccessoryUpdate,
}

/// Forwards updates over a channel, e.g. to the headless output
#[derive(Debug, Clone)]
pub struct ChannelAccessory {
    device: String,
    tx: mpsc::UnboundedSender<AccessoryEvent>,
}

impl ChannelAccessory {
    pub fn new(device: impl Into<String>, tx: mpsc::UnboundedSender<AccessoryEvent>) -> Self {
        Self {
            device: device.into(),
            tx,
        }
    }

    fn send(&self, update: AccessoryUpdate) {
        let event = AccessoryEvent {
            device: self.device.clone(),
            update,
        };
        if self.tx.send(event).is_err() {
            tracing::trace!(device = %self.device, "Accessory receiver dropped, update discarded");
        }
    }
}

impl AccessorySink for ChannelAccessory {
    fn update_power(&self, on: bool) {
        self.send(AccessoryUpdate::Power { on });
    }

    fn update_active_source(&self, id: SourceId) {
        self.send(AccessoryUpdate::ActiveSource { id });
    }

    fn publish_identity(&self, identity: &ProductIdentity) {
        self.send(AccessoryUpdate::Identity {
            identity: identity.clone(),
        });
    }
}
