//! Event reconciliation listener
//!
//! Registered on the device for every status channel. Each callback runs one
//! full reconciliation pass:
//!
//! 1. compare volume/mute against what was last announced
//! 2. refresh the resolver's derived state
//! 3. notify the surface: Player, then Root, then Volume if it changed
//! 4. run integration hooks
//!
//! A load failure skips steps 1 and 2: it only re-announces, so cached
//! duration survives it.
//!
//! Passes are never debounced or merged. A failed notification is logged
//! and skipped; the pass carries on with the remaining groups.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::{RawStatus, StatusObserver};
use crate::resolver::{MetadataResolver, Resolver};
use crate::surface::{PropertyGroup, SharedSurface};

/// Side work that rides along with every reconciliation pass
pub trait IntegrationHook: Send + Sync {
    /// `status` is `None` for passes without new raw status (load failures)
    fn on_new_status(&self, status: Option<&RawStatus>);
}

/// Volume/mute pair last announced to the surface
#[derive(Debug, Clone, Copy, PartialEq)]
struct VolumeState {
    level: Option<f64>,
    muted: Option<bool>,
}

impl VolumeState {
    /// Volume fields carried by a snapshot, if any. Missing fields keep the
    /// previously announced value; with nothing known either way there is no
    /// state at all.
    fn from_status(status: &RawStatus, previous: Option<VolumeState>) -> Option<Self> {
        let (level, muted) = match status {
            RawStatus::Cast(cast) => (Some(cast.volume_level), Some(cast.volume_muted)),
            RawStatus::Media(media) => (media.volume_level, media.volume_muted),
            _ => return None,
        };
        let level = level.or(previous.and_then(|p| p.level));
        let muted = muted.or(previous.and_then(|p| p.muted));
        if level.is_none() && muted.is_none() {
            return None;
        }
        Some(Self { level, muted })
    }
}

pub struct EventListener {
    resolver: Arc<Resolver>,
    surface: SharedSurface,
    hooks: Vec<Arc<dyn IntegrationHook>>,
    announced_volume: Mutex<Option<VolumeState>>,
    lost: CancellationToken,
}

impl EventListener {
    pub fn new(resolver: Arc<Resolver>, surface: SharedSurface) -> Self {
        Self {
            resolver,
            surface,
            hooks: Vec::new(),
            announced_volume: Mutex::new(None),
            lost: CancellationToken::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn IntegrationHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Cancelled once the device reports a connection state it won't
    /// recover from
    pub fn connection_lost(&self) -> CancellationToken {
        self.lost.clone()
    }

    fn volume_changed(&self, status: Option<&RawStatus>) -> bool {
        let Some(status) = status.filter(|s| s.carries_volume()) else {
            return false;
        };
        let mut announced = self
            .announced_volume
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        match VolumeState::from_status(status, *announced) {
            Some(current) if Some(current) != *announced => {
                *announced = Some(current);
                true
            }
            _ => false,
        }
    }

    fn announce(&self, group: PropertyGroup) {
        if let Err(e) = self.surface.notify(group) {
            warn!("Skipping {:?} announcement: {:#}", group, e);
        }
    }

    /// One complete reconciliation pass
    pub fn reconcile(&self, status: Option<&RawStatus>) {
        let volume_changed = self.volume_changed(status);
        self.resolver.refresh();
        self.announce_all(status, volume_changed);
    }

    /// Notify the surface and run the hooks, leaving resolver state alone
    fn announce_all(&self, status: Option<&RawStatus>, volume_changed: bool) {
        debug!(
            "Reconciling {} status: {:?}, volume changed: {}",
            status.map(RawStatus::channel).unwrap_or("no"),
            self.resolver.playstate(),
            volume_changed
        );

        self.announce(PropertyGroup::Player);
        self.announce(PropertyGroup::Root);
        if volume_changed {
            self.announce(PropertyGroup::Volume);
        }

        for hook in &self.hooks {
            hook.on_new_status(status);
        }
    }
}

impl StatusObserver for EventListener {
    fn on_status(&self, status: RawStatus) {
        match &status {
            RawStatus::Connection(conn) if conn.state.is_fatal() => {
                info!("Connection to {} ended: {:?}", self.resolver.device().name(), conn.state);
                self.lost.cancel();
            }
            RawStatus::LaunchFailure(failure) => {
                warn!(
                    "App {} failed to launch: {}",
                    failure.app_id.as_deref().unwrap_or("unknown"),
                    failure.reason.as_deref().unwrap_or("no reason given")
                );
            }
            _ => {}
        }

        self.reconcile(Some(&status));
    }

    fn on_load_media_failed(&self, item_id: Option<i64>, error_code: Option<i64>) {
        warn!(
            "Loading media failed (item {:?}, error {:?})",
            item_id, error_code
        );
        // Capabilities may have changed; cached duration stays
        self.announce_all(None, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CastStatus, ConnectionState, ConnectionStatus, MediaStatus};

    fn cast(level: f64, muted: bool) -> RawStatus {
        RawStatus::Cast(CastStatus {
            volume_level: level,
            volume_muted: muted,
            ..Default::default()
        })
    }

    #[test]
    fn test_volume_state_keeps_missing_fields() {
        let previous = VolumeState::from_status(&cast(0.3, true), None);
        let media = RawStatus::Media(MediaStatus {
            volume_level: Some(0.5),
            ..Default::default()
        });
        let merged = VolumeState::from_status(&media, previous).unwrap();
        assert_eq!(merged.level, Some(0.5));
        assert_eq!(merged.muted, Some(true));
    }

    #[test]
    fn test_media_without_volume_fields_is_no_state() {
        let media = RawStatus::Media(MediaStatus::default());
        assert!(VolumeState::from_status(&media, None).is_none());

        let previous = VolumeState::from_status(&cast(0.3, false), None);
        assert_eq!(VolumeState::from_status(&media, previous), previous);
    }

    #[test]
    fn test_connection_status_has_no_volume() {
        let status = RawStatus::Connection(ConnectionStatus {
            state: ConnectionState::Connected,
            address: None,
        });
        assert!(VolumeState::from_status(&status, None).is_none());
    }
}
