//! Desktop control surface seam.
//!
//! The control bus protocol lives outside this crate. A surface backend
//! exposes a [`PlayerAdapter`] over the bus, and the bridge pokes it with
//! [`ControlSurface::notify`] whenever a group of properties changed.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::resolver::Microseconds;

/// URI schemes `open_uri` accepts
pub const URI_SCHEMES: &[&str] = &["http", "https"];

/// MIME types advertised to control clients
pub const MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp4",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
    "audio/wav",
    "audio/webm",
    "video/mp4",
    "video/webm",
    "video/x-matroska",
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
    "application/dash+xml",
    "image/jpeg",
    "image/png",
];

/// Property groups the surface can be told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyGroup {
    /// Identity and top-level capabilities
    Root,
    /// Playback state, metadata, position
    Player,
    Volume,
    TrackList,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    #[default]
    None,
    Track,
    Playlist,
}

/// The "now playing" object control clients read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub track_id: String,
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub album_artists: Vec<String>,
    pub art_url: Option<String>,
    pub comments: Vec<String>,
    pub disc_number: u32,
    pub length: Microseconds,
    pub track_number: Option<u32>,
    pub url: Option<String>,
}

/// What a surface backend reads and drives.
///
/// Getters are cheap reads of local state. Commands are forwarded to the
/// device without waiting for confirmation; failures are logged, not
/// returned, since the bus has nothing useful to do with them.
pub trait PlayerAdapter: Send + Sync {
    // root
    fn identity(&self) -> String;
    fn uri_schemes(&self) -> Vec<String>;
    fn mime_types(&self) -> Vec<String>;
    fn desktop_entry(&self) -> String;
    fn can_quit(&self) -> bool;
    fn quit(&self);

    // capabilities
    fn can_control(&self) -> bool;
    fn can_play(&self) -> bool;
    fn can_pause(&self) -> bool;
    fn can_seek(&self) -> bool;
    fn can_go_next(&self) -> bool;
    fn can_go_previous(&self) -> bool;
    fn can_edit_tracks(&self) -> bool;

    // playback
    fn playstate(&self) -> PlayState;
    fn play(&self);
    fn pause(&self);
    fn resume(&self);
    fn play_pause(&self);
    fn stop(&self);
    fn next(&self);
    fn previous(&self);
    fn seek(&self, position: Microseconds);
    fn set_position(&self, track_id: &str, position: Microseconds);
    fn open_uri(&self, uri: &str);
    fn current_position(&self) -> Microseconds;
    fn duration(&self) -> Microseconds;
    fn rate(&self) -> f64;
    fn set_rate(&self, rate: f64);
    fn shuffle(&self) -> bool;
    fn set_shuffle(&self, shuffle: bool);
    fn loop_status(&self) -> LoopStatus;
    fn set_loop_status(&self, status: LoopStatus);
    fn is_repeating(&self) -> bool;
    fn is_playlist(&self) -> bool;

    // metadata
    fn metadata(&self) -> Metadata;
    fn stream_title(&self) -> String;
    fn art_url(&self) -> String;

    // volume
    fn volume(&self) -> Option<f64>;
    fn set_volume(&self, volume: f64);
    fn is_mute(&self) -> bool;
    fn set_mute(&self, muted: bool);

    // track list
    fn has_tracklist(&self) -> bool;
    fn tracks(&self) -> Vec<String>;
    fn add_track(&self, uri: &str, after_track: &str, set_as_current: bool);
}

/// A published control surface for one device
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Claim the surface's name on the bus
    fn publish(&self) -> Result<()>;

    /// Announce that properties in `group` changed. Called from device
    /// callback context; must not block on bus I/O.
    fn notify(&self, group: PropertyGroup) -> Result<()>;

    /// Serve bus requests until `shutdown` fires or the bus goes away
    async fn serve(&self, shutdown: CancellationToken) -> Result<()>;
}

pub type SharedSurface = Arc<dyn ControlSurface>;

/// Builds surfaces, supplied by the host binary
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, name: &str, adapter: Arc<dyn PlayerAdapter>) -> Result<SharedSurface>;
}
