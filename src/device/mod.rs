//! Casting receiver facade, status snapshots and discovery
//!
//! The cast protocol itself lives outside this crate. A protocol backend
//! implements [`DeviceHandle`] for one connected receiver and pushes status
//! snapshots to the registered [`StatusObserver`]. Everything the bridge asks
//! of a device is enumerated here; nothing else of the protocol leaks through.

pub mod locator;
pub mod mdns;
pub mod status;

use std::sync::Arc;

use anyhow::Result;

use crate::content::ContentRef;

pub use status::{
    CastStatus, ConnectionState, ConnectionStatus, LaunchFailure, MediaImage, MediaStatus,
    MediaType, PlayerState, RawStatus,
};

/// Receives raw status notifications from a device.
///
/// Called on whatever thread the transport uses. Implementations must not
/// block on network I/O.
pub trait StatusObserver: Send + Sync {
    /// A status snapshot arrived on one of the device channels
    fn on_status(&self, status: RawStatus);

    /// Loading a media item failed. Carries no new status.
    fn on_load_media_failed(&self, item_id: Option<i64>, error_code: Option<i64>);
}

/// A dedicated playback app on the receiver for recognized content
/// references (e.g. a video streaming service)
pub trait StreamingChannel: Send + Sync {
    /// Whether the app is the one currently running on the receiver
    fn is_active(&self) -> bool;

    fn launch(&self) -> Result<()>;

    /// Replace what is playing with `content`
    fn play(&self, content: &ContentRef) -> Result<()>;

    /// Append `content` to the app's queue
    fn enqueue(&self, content: &ContentRef) -> Result<()>;
}

/// One connected casting receiver.
///
/// Status getters return the last value the transport received on that
/// channel, or `None` before the first one. Commands are fire-and-forget:
/// any resulting state change arrives later as an ordinary status callback.
pub trait DeviceHandle: Send + Sync {
    fn name(&self) -> &str;

    fn uuid(&self) -> &str;

    fn media_status(&self) -> Option<MediaStatus>;

    fn cast_status(&self) -> Option<CastStatus>;

    fn connection_status(&self) -> Option<ConnectionStatus>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// Seek to an absolute position in whole seconds
    fn seek(&self, seconds: i64) -> Result<()>;

    fn queue_next(&self) -> Result<()>;

    fn queue_prev(&self) -> Result<()>;

    /// Raise volume by `delta` (0.0..=1.0 scale). Devices reject zero.
    fn volume_up(&self, delta: f64) -> Result<()>;

    /// Lower volume by `delta` (0.0..=1.0 scale). Devices reject zero.
    fn volume_down(&self, delta: f64) -> Result<()>;

    fn set_volume_muted(&self, muted: bool) -> Result<()>;

    /// Quit the running receiver app
    fn quit_app(&self) -> Result<()>;

    fn launch_app(&self, app_id: &str) -> Result<()>;

    /// Play a URI on the generic media receiver
    fn play_media(&self, uri: &str, mime_type: Option<&str>) -> Result<()>;

    /// The streaming sub-channel, if this device supports one
    fn streaming_channel(&self) -> Option<Arc<dyn StreamingChannel>>;

    fn register_listener(&self, listener: Arc<dyn StatusObserver>);

    /// Drop every listener registered by the bridge
    fn unregister_listeners(&self);

    /// Release the connection
    fn disconnect(&self);
}

/// Shared handle to a connected device
pub type SharedDevice = Arc<dyn DeviceHandle>;

/// Normalize a device uuid for comparison (case and hyphens ignored)
pub fn normalize_uuid(uuid: &str) -> String {
    uuid.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uuid() {
        assert_eq!(
            normalize_uuid("6A1B2C3D-0000-1111-2222-333344445555"),
            "6a1b2c3d000011112222333344445555"
        );
        assert_eq!(
            normalize_uuid("6a1b2c3d000011112222333344445555"),
            normalize_uuid("6A1B2C3D-0000-1111-2222-333344445555")
        );
    }
}
