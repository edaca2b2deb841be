//! Lifecycle event bus
//!
//! The supervisor publishes its state transitions here over a
//! tokio::sync::broadcast channel. Embedders and tests subscribe to watch
//! the bridge search, connect and drop without scraping logs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Supervisor transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    /// A discovery attempt is starting
    Searching { attempt: u32 },
    /// The attempt found nothing (or failed); `retry_in` is the wait before
    /// the next one, in seconds
    DeviceNotFound { attempt: u32, retry_in: Option<f64> },
    Connected { name: String, uuid: String },
    ConnectionLost { name: String },
    /// The supervisor loop exited
    Stopped,
}

/// Event bus handle for publishing and subscribing
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: BridgeEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

pub type SharedBus = Arc<EventBus>;

pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::default())
}
