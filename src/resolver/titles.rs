//! Title fallback chain

use super::{non_empty, Resolver};
use crate::resources::DESKTOP_NAME;

/// Slots kept after resolution (title, artist, album, comment)
pub const MAX_TITLES: usize = 4;

/// Resolved display strings. No value appears in two slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitlesModel {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub comment: Option<String>,
}

/// Accumulates title candidates in priority order
#[derive(Debug, Default)]
pub struct TitlesBuilder {
    candidates: Vec<String>,
}

impl TitlesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate. Empty or already-seen values are ignored.
    pub fn add(&mut self, value: Option<String>) -> &mut Self {
        if let Some(value) = non_empty(value) {
            if !self.candidates.contains(&value) {
                self.candidates.push(value);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Hand out candidates to slots in order; extras are dropped
    pub fn build(&self) -> TitlesModel {
        let mut slots = self.candidates.iter().take(MAX_TITLES).cloned();
        TitlesModel {
            title: slots.next(),
            artist: slots.next(),
            album: slots.next(),
            comment: slots.next(),
        }
    }
}

pub trait TitleResolver {
    fn titles(&self) -> TitlesModel;
}

impl TitleResolver for Resolver {
    fn titles(&self) -> TitlesModel {
        let mut builder = TitlesBuilder::new();

        if let Some(media) = self.media() {
            builder
                .add(media.title)
                .add(media.series_title)
                .add(media.subtitle)
                .add(media.artist)
                .add(media.album_name);
        }
        if let Some(cast) = self.cast() {
            builder.add(cast.display_name);
        }
        if builder.is_empty() {
            builder.add(Some(DESKTOP_NAME.to_string()));
        }

        builder.build()
    }
}
