//! Device locator - resolves a connected device from a name/host/uuid hint
//!
//! Resolution order is host, then uuid, then name, then (no hints at all)
//! the first device that answers discovery. Each lookup runs one discovery
//! pass and, failing that, a directed "listed" lookup for receivers that are
//! reachable but not broadcasting yet.
//!
//! "Not found" is `Ok(None)`. A host or uuid lookup that errors falls through
//! to the next identifier; an error from the final lookup is returned, and
//! the supervisor retries it like a miss.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::device::{normalize_uuid, SharedDevice};

/// Default cast control port
pub const DEFAULT_CAST_PORT: u16 = 8009;

/// Name given to a device reached by host when no name was supplied
pub const DEFAULT_DEVICE_NAME: &str = "Device";

/// A receiver seen on the network, not yet connected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRecord {
    pub name: String,
    pub uuid: String,
    pub host: String,
    pub port: u16,
    pub model: Option<String>,
}

impl DeviceRecord {
    /// Record for a receiver addressed directly by host
    pub fn from_host(host: &str, name: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or(DEFAULT_DEVICE_NAME).to_string(),
            uuid: String::new(),
            host: host.to_string(),
            port: DEFAULT_CAST_PORT,
            model: None,
        }
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    fn uuid_matches(&self, uuid: &str) -> bool {
        !self.uuid.is_empty() && normalize_uuid(&self.uuid) == normalize_uuid(uuid)
    }
}

/// Network discovery of casting receivers
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// One discovery pass: every receiver that answered within `timeout`
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceRecord>>;

    /// Directed lookup for specific receivers missing from the live scan
    async fn lookup_listed(
        &self,
        name: Option<&str>,
        uuid: Option<&str>,
        timeout: Duration,
    ) -> Result<Vec<DeviceRecord>>;
}

/// Opens the cast protocol connection to a discovered receiver
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Connect and return once the device reports itself ready
    async fn connect(&self, record: &DeviceRecord, timeout: Duration) -> Result<SharedDevice>;
}

/// What the caller knows about the device it wants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceQuery {
    pub name: Option<String>,
    pub host: Option<String>,
    pub uuid: Option<String>,
}

impl DeviceQuery {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.host.is_none() && self.uuid.is_none()
    }

    /// Human-readable label used in logs and errors
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.host.clone())
            .or_else(|| self.uuid.clone())
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
    }
}

pub struct DeviceLocator {
    discovery: Arc<dyn DeviceDiscovery>,
    connector: Arc<dyn DeviceConnector>,
}

impl DeviceLocator {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            discovery,
            connector,
        }
    }

    /// Resolve a device, short-circuiting on the first match.
    ///
    /// `retry_wait` bounds each discovery pass and each connection attempt.
    /// A failed lookup is logged and the next identifier is tried.
    pub async fn find_device(
        &self,
        query: &DeviceQuery,
        retry_wait: Duration,
    ) -> Result<Option<SharedDevice>> {
        let mut found = None;

        if let Some(host) = &query.host {
            found = settle(
                "host",
                self.via_host(host, query.name.as_deref(), retry_wait).await,
            );
        }

        if found.is_none() {
            if let Some(uuid) = &query.uuid {
                found = settle("uuid", self.via_uuid(uuid, retry_wait).await);
            }
        }

        if found.is_none() {
            if let Some(name) = &query.name {
                found = self.via_name(name, retry_wait).await?;
            }
        }

        if query.is_empty() {
            found = self.first(retry_wait).await?;
        }

        if let Some(device) = &found {
            info!("Found device {} ({})", device.name(), device.uuid());
        }
        Ok(found)
    }

    async fn via_host(
        &self,
        host: &str,
        name: Option<&str>,
        retry_wait: Duration,
    ) -> Result<Option<SharedDevice>> {
        debug!("Looking up device by host {}", host);
        let record = DeviceRecord::from_host(host, name);
        self.connector.connect(&record, retry_wait).await.map(Some)
    }

    async fn via_uuid(&self, uuid: &str, retry_wait: Duration) -> Result<Option<SharedDevice>> {
        debug!("Looking up device by uuid {}", uuid);
        let devices = self.discovery.discover(retry_wait).await?;

        if let Some(record) = devices.iter().find(|d| d.uuid_matches(uuid)) {
            return self.connect(record, retry_wait).await;
        }

        let listed = self
            .discovery
            .lookup_listed(None, Some(uuid), retry_wait)
            .await?;
        match listed.first() {
            Some(record) => self.connect(record, retry_wait).await,
            None => Ok(None),
        }
    }

    async fn via_name(&self, name: &str, retry_wait: Duration) -> Result<Option<SharedDevice>> {
        debug!("Looking up device by name {}", name);
        let mut devices = self.discovery.discover(retry_wait).await?;

        if !devices.iter().any(|d| d.name_matches(name)) {
            devices.extend(
                self.discovery
                    .lookup_listed(Some(name), None, retry_wait)
                    .await?,
            );
        }

        match devices.iter().find(|d| d.name_matches(name)) {
            Some(record) => self.connect(record, retry_wait).await,
            None => Ok(None),
        }
    }

    async fn first(&self, retry_wait: Duration) -> Result<Option<SharedDevice>> {
        debug!("Looking up first available device");
        let devices = self.discovery.discover(retry_wait).await?;
        match devices.first() {
            Some(record) => self.connect(record, retry_wait).await,
            None => Ok(None),
        }
    }

    async fn connect(
        &self,
        record: &DeviceRecord,
        retry_wait: Duration,
    ) -> Result<Option<SharedDevice>> {
        self.connector.connect(record, retry_wait).await.map(Some)
    }
}

/// A lookup that failed counts as a miss so the next identifier gets a turn
fn settle(by: &str, result: Result<Option<SharedDevice>>) -> Option<SharedDevice> {
    result.unwrap_or_else(|e| {
        warn!("Lookup by {} failed: {:#}", by, e);
        None
    })
}
