//! Raw status snapshots pushed by a casting receiver.
//!
//! Each snapshot describes one aspect of the device at the moment it was
//! sent. Snapshots from different channels are not guaranteed to agree with
//! each other (volume can arrive before play state after a reconnect).

use serde::{Deserialize, Serialize};

/// Media player state as reported on the media channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerState {
    Playing,
    Buffering,
    Paused,
    Idle,
    #[default]
    Unknown,
}

impl From<&str> for PlayerState {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PLAYING" => Self::Playing,
            "BUFFERING" => Self::Buffering,
            "PAUSED" => Self::Paused,
            "IDLE" => Self::Idle,
            _ => Self::Unknown,
        }
    }
}

/// Kind of media the receiver reports for the current item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Generic,
    Movie,
    MusicTrack,
    Photo,
    TvShow,
}

/// Artwork attached to the current media item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Snapshot from the media channel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaStatus {
    pub title: Option<String>,
    pub series_title: Option<String>,
    /// `subtitle` field inside the media metadata block
    pub subtitle: Option<String>,
    pub artist: Option<String>,
    pub album_name: Option<String>,
    pub track: Option<u32>,
    pub images: Vec<MediaImage>,
    pub media_type: Option<MediaType>,

    pub content_id: Option<String>,
    pub content_type: Option<String>,

    /// Total length in seconds, when the receiver knows it
    pub duration: Option<f64>,
    /// Position in seconds at the time of the last update
    pub current_time: Option<f64>,
    /// Position extrapolated to "now" by the transport layer
    pub adjusted_current_time: Option<f64>,
    pub playback_rate: Option<f64>,
    pub player_state: PlayerState,

    pub volume_level: Option<f64>,
    pub volume_muted: Option<bool>,

    pub supports_pause: bool,
    pub supports_seek: bool,
    pub supports_queue_next: bool,
    pub supports_queue_prev: bool,
}

impl MediaStatus {
    /// Playing or buffering towards playing
    pub fn is_playing(&self) -> bool {
        matches!(self.player_state, PlayerState::Playing | PlayerState::Buffering)
    }

    pub fn is_paused(&self) -> bool {
        self.player_state == PlayerState::Paused
    }
}

/// Snapshot from the receiver channel (running app, volume)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CastStatus {
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub icon_url: Option<String>,
    pub status_text: Option<String>,
    pub volume_level: f64,
    pub volume_muted: bool,
}

/// Transport connection state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    FailedResolve,
    Lost,
    #[default]
    Unknown,
}

impl ConnectionState {
    /// States after which the transport will not recover on its own
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Disconnected | Self::Failed | Self::FailedResolve | Self::Lost
        )
    }
}

/// Snapshot from the connection channel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub address: Option<String>,
}

/// Receiver app launch failure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LaunchFailure {
    pub reason: Option<String>,
    pub app_id: Option<String>,
}

/// One raw status notification, tagged by the channel it arrived on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "channel", content = "status")]
pub enum RawStatus {
    Media(MediaStatus),
    Cast(CastStatus),
    Connection(ConnectionStatus),
    LaunchFailure(LaunchFailure),
}

impl RawStatus {
    /// Whether this snapshot carries volume/mute fields
    pub fn carries_volume(&self) -> bool {
        matches!(self, Self::Media(_) | Self::Cast(_))
    }

    pub fn channel(&self) -> &'static str {
        match self {
            Self::Media(_) => "media",
            Self::Cast(_) => "cast",
            Self::Connection(_) => "connection",
            Self::LaunchFailure(_) => "launch_error",
        }
    }
}
