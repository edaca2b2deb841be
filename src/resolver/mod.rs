//! Derived-state resolver
//!
//! Turns the device's latest raw snapshots into the consistent view the
//! control surface polls: titles, position/duration, artwork, volume and
//! capability flags. Each concern is a small trait implemented on the one
//! [`Resolver`] type; they share the device snapshot and a tiny local cache
//! (longest duration seen for the current stream, last icon resolved).
//!
//! Nothing here performs network I/O beyond issuing fire-and-forget device
//! commands, so a resolver can be driven straight from a status callback.

mod abilities;
mod icon;
mod metadata;
mod time;
mod titles;
mod volume;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::device::{CastStatus, MediaStatus, SharedDevice};
use crate::resources::ResourceCache;

pub use abilities::AbilityQuery;
pub use icon::{CachedIcon, IconResolver};
pub use metadata::{track_id, MetadataResolver, DEFAULT_DISC_NUMBER, DEFAULT_TRACK_ID};
pub use time::{to_microseconds, Microseconds, TimeResolver, US_IN_SEC};
pub use titles::{TitleResolver, TitlesBuilder, TitlesModel, MAX_TITLES};
pub use volume::VolumeController;

/// Resolver-local state that outlives a single pass
#[derive(Debug, Default)]
struct ResolverCache {
    longest_duration: Option<Microseconds>,
    cached_icon: Option<CachedIcon>,
}

pub struct Resolver {
    device: SharedDevice,
    resources: Arc<ResourceCache>,
    light_icon: AtomicBool,
    cache: Mutex<ResolverCache>,
}

impl Resolver {
    pub fn new(device: SharedDevice, resources: Arc<ResourceCache>, light_icon: bool) -> Self {
        Self {
            device,
            resources,
            light_icon: AtomicBool::new(light_icon),
            cache: Mutex::new(ResolverCache::default()),
        }
    }

    pub fn device(&self) -> &SharedDevice {
        &self.device
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    pub fn set_light_icon(&self, light: bool) {
        self.light_icon.store(light, Ordering::Relaxed);
    }

    pub fn light_icon(&self) -> bool {
        self.light_icon.load(Ordering::Relaxed)
    }

    /// Bookkeeping run at the start of every reconciliation pass
    pub fn refresh(&self) {
        self.reset_longest_duration();
    }

    fn media(&self) -> Option<MediaStatus> {
        self.device.media_status()
    }

    fn cast(&self) -> Option<CastStatus> {
        self.device.cast_status()
    }

    fn app_id(&self) -> Option<String> {
        self.cast().and_then(|c| c.app_id)
    }

    fn cache(&self) -> MutexGuard<'_, ResolverCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Empty strings count as missing
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
