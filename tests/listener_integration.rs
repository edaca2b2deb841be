//! Reconciliation passes against a fake receiver and surface
//!
//! Covers load failures, integration hooks, failed notifications and
//! the volume-change gate.

mod common;

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use cast_bridge::device::{CastStatus, MediaStatus, PlayerState, RawStatus, StatusObserver};
use cast_bridge::listener::{EventListener, IntegrationHook};
use cast_bridge::resolver::{Resolver, TimeResolver};
use cast_bridge::resources::ResourceCache;
use cast_bridge::surface::PropertyGroup;

use common::*;

/// Remembers which channel each pass carried, `None` for load failures
#[derive(Default)]
struct RecordingHook {
    passes: Mutex<Vec<Option<String>>>,
}

impl RecordingHook {
    fn passes(&self) -> Vec<Option<String>> {
        self.passes.lock().unwrap().clone()
    }
}

impl IntegrationHook for RecordingHook {
    fn on_new_status(&self, status: Option<&RawStatus>) {
        self.passes
            .lock()
            .unwrap()
            .push(status.map(|s| s.channel().to_string()));
    }
}

struct Fixture {
    device: Arc<FakeDevice>,
    resolver: Arc<Resolver>,
    surface: Arc<FakeSurface>,
    hook: Arc<RecordingHook>,
    listener: EventListener,
    _data: TempDir,
}

fn fixture() -> Fixture {
    let data = TempDir::new().unwrap();
    let device = FakeDevice::new("Radio");
    let resolver = Arc::new(Resolver::new(
        device.clone(),
        Arc::new(ResourceCache::new(data.path())),
        false,
    ));
    let surface = Arc::new(FakeSurface::default());
    let hook = Arc::new(RecordingHook::default());
    let listener = EventListener::new(resolver.clone(), surface.clone())
        .with_hooks(vec![hook.clone() as Arc<dyn IntegrationHook>]);

    Fixture {
        device,
        resolver,
        surface,
        hook,
        listener,
        _data: data,
    }
}

fn live_at(current: f64) -> MediaStatus {
    MediaStatus {
        title: Some("Live".into()),
        current_time: Some(current),
        player_state: PlayerState::Playing,
        ..Default::default()
    }
}

fn cast(level: f64) -> RawStatus {
    RawStatus::Cast(CastStatus {
        volume_level: level,
        ..Default::default()
    })
}

#[test]
fn load_failure_reannounces_and_keeps_duration() {
    let f = fixture();
    let media = live_at(30.0);
    f.device.set_media(media.clone());
    f.listener.on_status(RawStatus::Media(media));
    assert_eq!(f.resolver.duration(), 30_000_000);

    // The receiver drops back to no position after the failed load
    f.device.set_media(MediaStatus {
        player_state: PlayerState::Idle,
        ..Default::default()
    });
    f.listener.on_load_media_failed(Some(3), Some(905));

    assert_eq!(f.surface.count(PropertyGroup::Player), 2);
    assert_eq!(f.surface.count(PropertyGroup::Root), 2);
    assert_eq!(f.surface.count(PropertyGroup::Volume), 0);
    assert_eq!(f.resolver.duration(), 30_000_000);
}

#[test]
fn hooks_run_once_per_pass() {
    let f = fixture();

    f.listener.on_status(cast(0.5));
    f.listener.on_load_media_failed(None, None);
    f.listener.on_status(RawStatus::Media(live_at(1.0)));

    assert_eq!(
        f.hook.passes(),
        vec![Some("cast".to_string()), None, Some("media".to_string())]
    );
}

#[test]
fn failed_notification_skips_only_that_group() {
    let f = fixture();
    f.surface.reject(PropertyGroup::Player);

    f.listener.on_status(cast(0.5));

    assert_eq!(
        f.surface.notified(),
        vec![PropertyGroup::Root, PropertyGroup::Volume]
    );
    assert_eq!(f.hook.passes().len(), 1);
}

#[test]
fn media_without_volume_fields_announces_no_volume() {
    let f = fixture();

    f.listener.on_status(RawStatus::Media(live_at(1.0)));
    assert_eq!(f.surface.count(PropertyGroup::Volume), 0);

    f.listener.on_status(cast(0.5));
    f.listener.on_status(RawStatus::Media(live_at(2.0)));
    assert_eq!(f.surface.count(PropertyGroup::Volume), 1);
}
