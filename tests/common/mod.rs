//! In-memory fakes for the device, discovery and surface seams

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use cast_bridge::bus::{create_bus, BridgeEvent, SharedBus};
use cast_bridge::content::ContentRef;
use cast_bridge::device::locator::{DeviceConnector, DeviceDiscovery, DeviceRecord};
use cast_bridge::device::{
    CastStatus, ConnectionStatus, DeviceHandle, MediaStatus, RawStatus, SharedDevice,
    StatusObserver, StreamingChannel,
};
use cast_bridge::surface::{
    ControlSurface, PlayerAdapter, PropertyGroup, SharedSurface, SurfaceFactory,
};

// =============================================================================
// Device
// =============================================================================

#[derive(Default)]
struct DeviceState {
    media: Option<MediaStatus>,
    cast: Option<CastStatus>,
    connection: Option<ConnectionStatus>,
    listeners: Vec<Arc<dyn StatusObserver>>,
    calls: Vec<String>,
    disconnected: bool,
}

/// Receiver that records every command and replays status on demand
pub struct FakeDevice {
    name: String,
    uuid: String,
    channel: Option<Arc<FakeChannel>>,
    state: Mutex<DeviceState>,
}

impl FakeDevice {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            uuid: format!("uuid-{}", name.to_lowercase().replace(' ', "-")),
            channel: None,
            state: Mutex::default(),
        })
    }

    pub fn with_channel(name: &str, channel: Arc<FakeChannel>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            uuid: format!("uuid-{}", name.to_lowercase().replace(' ', "-")),
            channel: Some(channel),
            state: Mutex::default(),
        })
    }

    /// Store the snapshot, then deliver it to every listener
    pub fn emit(&self, status: RawStatus) {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            match &status {
                RawStatus::Media(media) => state.media = Some(media.clone()),
                RawStatus::Cast(cast) => state.cast = Some(cast.clone()),
                RawStatus::Connection(conn) => state.connection = Some(conn.clone()),
                RawStatus::LaunchFailure(_) => {}
            }
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_status(status.clone());
        }
    }

    pub fn set_media(&self, media: MediaStatus) {
        self.state.lock().unwrap().media = Some(media);
    }

    pub fn set_cast(&self, cast: CastStatus) {
        self.state.lock().unwrap().cast = Some(cast);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().unwrap().listeners.len()
    }

    pub fn is_disconnected(&self) -> bool {
        self.state.lock().unwrap().disconnected
    }

    fn record(&self, call: String) -> Result<()> {
        self.state.lock().unwrap().calls.push(call);
        Ok(())
    }
}

impl DeviceHandle for FakeDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn media_status(&self) -> Option<MediaStatus> {
        self.state.lock().unwrap().media.clone()
    }

    fn cast_status(&self) -> Option<CastStatus> {
        self.state.lock().unwrap().cast.clone()
    }

    fn connection_status(&self) -> Option<ConnectionStatus> {
        self.state.lock().unwrap().connection.clone()
    }

    fn play(&self) -> Result<()> {
        self.record("play".into())
    }

    fn pause(&self) -> Result<()> {
        self.record("pause".into())
    }

    fn stop(&self) -> Result<()> {
        self.record("stop".into())
    }

    fn seek(&self, seconds: i64) -> Result<()> {
        self.record(format!("seek {}", seconds))
    }

    fn queue_next(&self) -> Result<()> {
        self.record("queue_next".into())
    }

    fn queue_prev(&self) -> Result<()> {
        self.record("queue_prev".into())
    }

    fn volume_up(&self, delta: f64) -> Result<()> {
        self.record(format!("volume_up {:.2}", delta))
    }

    fn volume_down(&self, delta: f64) -> Result<()> {
        self.record(format!("volume_down {:.2}", delta))
    }

    fn set_volume_muted(&self, muted: bool) -> Result<()> {
        self.record(format!("mute {}", muted))
    }

    fn quit_app(&self) -> Result<()> {
        self.record("quit_app".into())
    }

    fn launch_app(&self, app_id: &str) -> Result<()> {
        self.record(format!("launch_app {}", app_id))
    }

    fn play_media(&self, uri: &str, mime_type: Option<&str>) -> Result<()> {
        self.record(format!("play_media {} {}", uri, mime_type.unwrap_or("-")))
    }

    fn streaming_channel(&self) -> Option<Arc<dyn StreamingChannel>> {
        self.channel
            .clone()
            .map(|c| c as Arc<dyn StreamingChannel>)
    }

    fn register_listener(&self, listener: Arc<dyn StatusObserver>) {
        self.state.lock().unwrap().listeners.push(listener);
    }

    fn unregister_listeners(&self) {
        self.state.lock().unwrap().listeners.clear();
    }

    fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }
}

/// Streaming sub-channel that records what it was asked to do
#[derive(Default)]
pub struct FakeChannel {
    active: Mutex<bool>,
    calls: Mutex<Vec<String>>,
}

impl FakeChannel {
    pub fn new(active: bool) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(active),
            calls: Mutex::default(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl StreamingChannel for FakeChannel {
    fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }

    fn launch(&self) -> Result<()> {
        *self.active.lock().unwrap() = true;
        self.calls.lock().unwrap().push("launch".into());
        Ok(())
    }

    fn play(&self, content: &ContentRef) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("play {}", content.id));
        Ok(())
    }

    fn enqueue(&self, content: &ContentRef) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("enqueue {}", content.id));
        Ok(())
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Each discovery pass pops the next scripted result; once the script runs
/// out every pass returns `fallback`.
pub struct FakeDiscovery {
    script: Mutex<VecDeque<Vec<DeviceRecord>>>,
    fallback: Vec<DeviceRecord>,
    passes: AtomicUsize,
}

impl FakeDiscovery {
    pub fn new(script: Vec<Vec<DeviceRecord>>, fallback: Vec<DeviceRecord>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            passes: AtomicUsize::new(0),
        })
    }

    pub fn always(records: Vec<DeviceRecord>) -> Arc<Self> {
        Self::new(Vec::new(), records)
    }

    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceDiscovery for FakeDiscovery {
    async fn discover(&self, _timeout: Duration) -> Result<Vec<DeviceRecord>> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn lookup_listed(
        &self,
        _name: Option<&str>,
        _uuid: Option<&str>,
        _timeout: Duration,
    ) -> Result<Vec<DeviceRecord>> {
        Ok(Vec::new())
    }
}

pub fn record(name: &str) -> DeviceRecord {
    DeviceRecord {
        name: name.to_string(),
        uuid: format!("uuid-{}", name.to_lowercase().replace(' ', "-")),
        host: "192.168.1.20".to_string(),
        port: 8009,
        model: Some("Chromecast".to_string()),
    }
}

/// Hands out pre-built devices by name, in order for repeated connects
pub struct FakeConnector {
    devices: Mutex<HashMap<String, VecDeque<Arc<FakeDevice>>>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(devices: Vec<Arc<FakeDevice>>) -> Arc<Self> {
        let mut by_name: HashMap<String, VecDeque<Arc<FakeDevice>>> = HashMap::new();
        for device in devices {
            by_name
                .entry(device.name().to_string())
                .or_default()
                .push_back(device);
        }
        Arc::new(Self {
            devices: Mutex::new(by_name),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn connect(&self, record: &DeviceRecord, _timeout: Duration) -> Result<SharedDevice> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let mut devices = self.devices.lock().unwrap();
        let queue = devices
            .get_mut(&record.name)
            .ok_or_else(|| anyhow!("no such device {}", record.name))?;
        let device = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        device
            .map(|d| d as SharedDevice)
            .ok_or_else(|| anyhow!("no such device {}", record.name))
    }
}

// =============================================================================
// Surface
// =============================================================================

/// Surface that counts notifications per group and serves until cancelled
#[derive(Default)]
pub struct FakeSurface {
    notified: Mutex<Vec<PropertyGroup>>,
    rejected: Mutex<Option<PropertyGroup>>,
    published: Mutex<bool>,
    adapter: Mutex<Option<Arc<dyn PlayerAdapter>>>,
}

impl FakeSurface {
    pub fn notified(&self) -> Vec<PropertyGroup> {
        self.notified.lock().unwrap().clone()
    }

    pub fn count(&self, group: PropertyGroup) -> usize {
        self.notified().iter().filter(|g| **g == group).count()
    }

    /// Make every notification for `group` fail
    pub fn reject(&self, group: PropertyGroup) {
        *self.rejected.lock().unwrap() = Some(group);
    }

    pub fn clear(&self) {
        self.notified.lock().unwrap().clear();
    }

    pub fn is_published(&self) -> bool {
        *self.published.lock().unwrap()
    }

    pub fn adapter(&self) -> Option<Arc<dyn PlayerAdapter>> {
        self.adapter.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlSurface for FakeSurface {
    fn publish(&self) -> Result<()> {
        *self.published.lock().unwrap() = true;
        Ok(())
    }

    fn notify(&self, group: PropertyGroup) -> Result<()> {
        if *self.rejected.lock().unwrap() == Some(group) {
            return Err(anyhow!("{:?} signal rejected", group));
        }
        self.notified.lock().unwrap().push(group);
        Ok(())
    }

    async fn serve(&self, shutdown: CancellationToken) -> Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }
}

/// Keeps every surface it built so tests can inspect them
#[derive(Default)]
pub struct FakeSurfaceFactory {
    surfaces: Mutex<Vec<Arc<FakeSurface>>>,
    failures: AtomicUsize,
}

impl FakeSurfaceFactory {
    /// The next `count` calls to `create` fail
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn surfaces(&self) -> Vec<Arc<FakeSurface>> {
        self.surfaces.lock().unwrap().clone()
    }

    pub fn latest(&self) -> Option<Arc<FakeSurface>> {
        self.surfaces.lock().unwrap().last().cloned()
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create(&self, name: &str, adapter: Arc<dyn PlayerAdapter>) -> Result<SharedSurface> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("no session bus for {}", name));
        }
        let surface = Arc::new(FakeSurface::default());
        *surface.adapter.lock().unwrap() = Some(adapter);
        self.surfaces.lock().unwrap().push(surface.clone());
        Ok(surface)
    }
}

// =============================================================================
// Bus
// =============================================================================

pub fn test_bus() -> (SharedBus, broadcast::Receiver<BridgeEvent>) {
    let bus = create_bus();
    let rx = bus.subscribe();
    (bus, rx)
}

/// Wait for a matching event, skipping others
pub async fn expect_event<F>(
    rx: &mut broadcast::Receiver<BridgeEvent>,
    predicate: F,
    deadline: Duration,
) -> Option<BridgeEvent>
where
    F: Fn(&BridgeEvent) -> bool,
{
    timeout(deadline, async {
        loop {
            match rx.recv().await {
                Ok(event) if predicate(&event) => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
