//! What is playing: play state, metadata object, track ids, URLs

use super::{
    non_empty, IconResolver, Resolver, TimeResolver, TitleResolver, TitlesModel,
};
use crate::content::watch_url;
use crate::device::MediaType;
use crate::surface::{Metadata, PlayState};

pub const DEFAULT_TRACK_ID: &str = "/track/1";
pub const DEFAULT_DISC_NUMBER: u32 = 1;

/// Content ids starting with this are already full URLs
const URL_PREFIX: &str = "http";

/// Object path for a track, derived from its title
pub fn track_id(title: Option<&str>) -> String {
    let Some(title) = title.filter(|t| !t.is_empty()) else {
        return DEFAULT_TRACK_ID.to_string();
    };
    let name: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("/track/{}", name)
}

pub trait MetadataResolver {
    fn playstate(&self) -> PlayState;

    fn metadata(&self) -> Metadata;

    /// Raw media title, else the resolved title
    fn stream_title(&self) -> String;

    /// URL of the current item, rebuilt from a bare id for streaming apps
    fn content_url(&self) -> Option<String>;

    fn media_type(&self) -> Option<MediaType>;

    /// Track ids of the (single-entry) track list
    fn tracks(&self) -> Vec<String>;
}

impl Resolver {
    fn streaming_active(&self) -> bool {
        self.device
            .streaming_channel()
            .map(|ch| ch.is_active())
            .unwrap_or(false)
    }
}

impl MetadataResolver for Resolver {
    fn playstate(&self) -> PlayState {
        match self.media() {
            Some(m) if m.is_playing() => PlayState::Playing,
            Some(m) if m.is_paused() => PlayState::Paused,
            _ => PlayState::Stopped,
        }
    }

    fn metadata(&self) -> Metadata {
        let TitlesModel {
            title,
            artist,
            album,
            ..
        } = self.titles();
        let artists: Vec<String> = artist.into_iter().collect();
        let art_url = Some(self.art_url()).filter(|u| !u.is_empty());

        Metadata {
            track_id: track_id(title.as_deref()),
            title,
            album_artists: artists.clone(),
            artists,
            album,
            art_url,
            comments: Vec::new(),
            disc_number: DEFAULT_DISC_NUMBER,
            length: self.duration(),
            track_number: self.media().and_then(|m| m.track),
            url: self.content_url(),
        }
    }

    fn stream_title(&self) -> String {
        non_empty(self.media().and_then(|m| m.title))
            .or_else(|| self.titles().title)
            .unwrap_or_default()
    }

    fn content_url(&self) -> Option<String> {
        let content_id = non_empty(self.media().and_then(|m| m.content_id))?;
        if self.streaming_active() && !content_id.starts_with(URL_PREFIX) {
            return Some(watch_url(&content_id));
        }
        Some(content_id)
    }

    fn media_type(&self) -> Option<MediaType> {
        self.media()
            .map(|m| m.media_type.unwrap_or(MediaType::Generic))
    }

    fn tracks(&self) -> Vec<String> {
        match self.titles().title {
            Some(title) => vec![track_id(Some(&title))],
            None => Vec::new(),
        }
    }
}
