//! Artwork resolution with a one-entry cache.
//!
//! Some apps only send artwork on the first status of an item. The last
//! icon obtained from the device is remembered together with the running
//! app and resolved title, and reused while both still match.

use super::{non_empty, Resolver, TitleResolver};
use crate::resources::IconVariant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIcon {
    pub url: String,
    pub app_id: Option<String>,
    pub title: Option<String>,
}

pub trait IconResolver {
    /// Artwork URL or path for the current item. Never fails: falls back to
    /// the bundled icon, then to an empty string.
    fn art_url(&self) -> String;

    /// Path of the desktop entry for the current icon variant, or empty
    fn desktop_entry(&self) -> String;
}

impl Resolver {
    fn icon_from_device(&self) -> Option<String> {
        let image = self
            .media()
            .and_then(|m| m.images.into_iter().next())
            .map(|i| i.url);
        let fresh = non_empty(image).or_else(|| non_empty(self.cast().and_then(|c| c.icon_url)));

        if let Some(url) = fresh {
            self.remember_icon(&url);
            return Some(url);
        }

        let app_id = self.app_id();
        let title = self.titles().title;
        let cached = self.cache().cached_icon.clone();
        cached
            .filter(|icon| icon.app_id == app_id && icon.title == title)
            .map(|icon| icon.url)
    }

    fn remember_icon(&self, url: &str) {
        let icon = CachedIcon {
            url: url.to_string(),
            app_id: self.app_id(),
            title: self.titles().title,
        };
        self.cache().cached_icon = Some(icon);
    }

    fn variant(&self) -> IconVariant {
        IconVariant::from_light(self.light_icon())
    }
}

impl IconResolver for Resolver {
    fn art_url(&self) -> String {
        self.icon_from_device()
            .unwrap_or_else(|| self.resources.icon_path(self.variant()))
    }

    fn desktop_entry(&self) -> String {
        self.resources.desktop_entry(self.variant())
    }
}
