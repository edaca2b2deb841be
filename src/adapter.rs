//! Control-surface adapter over one device.
//!
//! Reads go to the [`Resolver`]; commands go to the device facade. Command
//! errors are logged at warn and dropped: the bus has no way to report them
//! and the next status event will show the real state anyway.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};
use url::Url;

use crate::content::classify;
use crate::device::SharedDevice;
use crate::resolver::{
    AbilityQuery, IconResolver, MetadataResolver, Microseconds, Resolver, TimeResolver,
    VolumeController,
};
use crate::surface::{LoopStatus, Metadata, PlayState, PlayerAdapter, MIME_TYPES, URI_SCHEMES};

pub struct DeviceAdapter {
    name: String,
    resolver: Arc<Resolver>,
}

impl DeviceAdapter {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            name: resolver.device().name().to_string(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    fn device(&self) -> &SharedDevice {
        self.resolver.device()
    }

    fn run(&self, command: &str, result: Result<()>) {
        match result {
            Ok(()) => debug!("{}: {}", self.name, command),
            Err(e) => warn!("{}: {} failed: {:#}", self.name, command, e),
        }
    }

    /// Recognized references go to the streaming app (launched first if
    /// needed); anything else to the generic media player.
    fn open(&self, uri: &str) -> Result<()> {
        if let (Some(content), Some(channel)) = (classify(uri), self.device().streaming_channel())
        {
            if !channel.is_active() {
                channel.launch()?;
            }
            return channel.play(&content);
        }

        let mime = guess_mime(uri);
        self.device().play_media(uri, mime.as_deref())
    }

    fn enqueue(&self, uri: &str, set_as_current: bool) -> Result<()> {
        let Some(channel) = self.device().streaming_channel() else {
            return self.open(uri);
        };

        match classify(uri) {
            Some(content) => {
                channel.enqueue(&content)?;
                if set_as_current {
                    channel.play(&content)?;
                }
                Ok(())
            }
            None if set_as_current => self.open(uri),
            None => Ok(()),
        }
    }
}

fn guess_mime(uri: &str) -> Option<String> {
    let path = Url::parse(uri)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| uri.to_string());
    mime_guess::from_path(path).first_raw().map(String::from)
}

impl PlayerAdapter for DeviceAdapter {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn uri_schemes(&self) -> Vec<String> {
        URI_SCHEMES.iter().map(|s| s.to_string()).collect()
    }

    fn mime_types(&self) -> Vec<String> {
        MIME_TYPES.iter().map(|s| s.to_string()).collect()
    }

    fn desktop_entry(&self) -> String {
        self.resolver.desktop_entry()
    }

    fn can_quit(&self) -> bool {
        self.resolver.can_quit()
    }

    fn quit(&self) {
        self.run("quit", self.device().quit_app());
    }

    fn can_control(&self) -> bool {
        self.resolver.can_control()
    }

    fn can_play(&self) -> bool {
        self.resolver.can_play()
    }

    fn can_pause(&self) -> bool {
        self.resolver.can_pause()
    }

    fn can_seek(&self) -> bool {
        self.resolver.can_seek()
    }

    fn can_go_next(&self) -> bool {
        self.resolver.can_go_next()
    }

    fn can_go_previous(&self) -> bool {
        self.resolver.can_go_previous()
    }

    fn can_edit_tracks(&self) -> bool {
        self.resolver.can_edit_tracks()
    }

    fn playstate(&self) -> PlayState {
        self.resolver.playstate()
    }

    fn play(&self) {
        self.run("play", self.device().play());
    }

    fn pause(&self) {
        self.run("pause", self.device().pause());
    }

    fn resume(&self) {
        self.play();
    }

    fn play_pause(&self) {
        match self.playstate() {
            PlayState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    fn stop(&self) {
        self.run("stop", self.device().stop());
    }

    fn next(&self) {
        self.run("next", self.device().queue_next());
    }

    fn previous(&self) {
        self.run("previous", self.device().queue_prev());
    }

    fn seek(&self, position: Microseconds) {
        self.run("seek", self.resolver.seek(position));
    }

    fn set_position(&self, _track_id: &str, position: Microseconds) {
        self.seek(position);
    }

    fn open_uri(&self, uri: &str) {
        self.run("open_uri", self.open(uri));
    }

    fn current_position(&self) -> Microseconds {
        self.resolver.current_position()
    }

    fn duration(&self) -> Microseconds {
        self.resolver.duration()
    }

    fn rate(&self) -> f64 {
        self.resolver.rate()
    }

    fn set_rate(&self, _rate: f64) {}

    fn shuffle(&self) -> bool {
        false
    }

    fn set_shuffle(&self, _shuffle: bool) {}

    fn loop_status(&self) -> LoopStatus {
        LoopStatus::None
    }

    fn set_loop_status(&self, _status: LoopStatus) {}

    fn is_repeating(&self) -> bool {
        false
    }

    fn is_playlist(&self) -> bool {
        self.can_go_next() || self.can_go_previous()
    }

    fn metadata(&self) -> Metadata {
        self.resolver.metadata()
    }

    fn stream_title(&self) -> String {
        self.resolver.stream_title()
    }

    fn art_url(&self) -> String {
        self.resolver.art_url()
    }

    fn volume(&self) -> Option<f64> {
        self.resolver.volume()
    }

    fn set_volume(&self, volume: f64) {
        self.run("set_volume", self.resolver.set_volume(volume));
    }

    fn is_mute(&self) -> bool {
        self.resolver.is_muted()
    }

    fn set_mute(&self, muted: bool) {
        self.run("set_mute", self.resolver.set_muted(muted));
    }

    fn has_tracklist(&self) -> bool {
        true
    }

    fn tracks(&self) -> Vec<String> {
        self.resolver.tracks()
    }

    fn add_track(&self, uri: &str, _after_track: &str, set_as_current: bool) {
        self.run("add_track", self.enqueue(uri, set_as_current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_ignores_query() {
        assert_eq!(
            guess_mime("http://host/a/song.mp3?token=1").as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(guess_mime("http://host/stream").as_deref(), None);
        assert_eq!(guess_mime("/local/clip.mp4").as_deref(), Some("video/mp4"));
    }
}
