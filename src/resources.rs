//! Bundled resources written out to the data directory on demand:
//! the fallback artwork icons and the `.desktop` entry the control surface
//! advertises.
//!
//! Files are rewritten only when their content differs from the bundled
//! version, and each path is memoized per icon variant for the lifetime of
//! the cache. Failures degrade to [`NO_ENTRY`] instead of propagating.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rust_embed::RustEmbed;
use tracing::{debug, warn};

use crate::error::BridgeError;

/// Display name used in the desktop entry and as the last-resort title
pub const DESKTOP_NAME: &str = "Cast Control";

/// Sentinel returned when a resource could not be produced
pub const NO_ENTRY: &str = "";

const TEMPLATE: &str = "template.desktop";
const DARK_ICON: &str = "icon/cc-black.svg";
const LIGHT_ICON: &str = "icon/cc-white.svg";

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Which icon colour to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconVariant {
    /// Dark glyph, for light panels
    Dark,
    /// Light glyph, for dark panels
    Light,
}

impl IconVariant {
    pub fn from_light(light: bool) -> Self {
        if light {
            Self::Light
        } else {
            Self::Dark
        }
    }

    fn asset(self) -> &'static str {
        match self {
            Self::Dark => DARK_ICON,
            Self::Light => LIGHT_ICON,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

#[derive(Default)]
struct Memo {
    icons: HashMap<IconVariant, String>,
    entries: HashMap<IconVariant, String>,
}

/// Owner of every file the bridge materializes outside its state dir
pub struct ResourceCache {
    data_dir: PathBuf,
    memo: Mutex<Memo>,
}

impl ResourceCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the bundled icon on disk, or [`NO_ENTRY`]
    pub fn icon_path(&self, variant: IconVariant) -> String {
        if let Some(path) = self.memo().icons.get(&variant) {
            return path.clone();
        }

        match self.write_icon(variant) {
            Ok(path) => {
                let path = path.to_string_lossy().into_owned();
                self.memo().icons.insert(variant, path.clone());
                path
            }
            Err(e) => {
                warn!("{}", e);
                NO_ENTRY.to_string()
            }
        }
    }

    /// Path of the generated desktop entry, or [`NO_ENTRY`]
    pub fn desktop_entry(&self, variant: IconVariant) -> String {
        if let Some(path) = self.memo().entries.get(&variant) {
            return path.clone();
        }

        match self.write_desktop_entry(variant) {
            Ok(path) => {
                let path = path.to_string_lossy().into_owned();
                self.memo().entries.insert(variant, path.clone());
                path
            }
            Err(e) => {
                warn!("{}", e);
                NO_ENTRY.to_string()
            }
        }
    }

    fn memo(&self) -> std::sync::MutexGuard<'_, Memo> {
        self.memo.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write_icon(&self, variant: IconVariant) -> Result<PathBuf, BridgeError> {
        let asset = Assets::get(variant.asset()).ok_or_else(|| {
            BridgeError::IconResolution(format!("missing bundled icon {}", variant.asset()))
        })?;
        let path = self.data_dir.join(variant.asset());

        write_if_changed(&path, &asset.data)
            .map_err(|e| BridgeError::IconResolution(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }

    fn write_desktop_entry(&self, variant: IconVariant) -> Result<PathBuf, BridgeError> {
        let template = Assets::get(TEMPLATE)
            .ok_or_else(|| BridgeError::DesktopEntry("missing desktop template".into()))?;
        let template = String::from_utf8_lossy(&template.data).into_owned();

        let icon = self.icon_path(variant);
        if icon.is_empty() {
            return Err(BridgeError::DesktopEntry("no icon available".into()));
        }

        let path = self.data_dir.join(format!(
            "{}-{}.desktop",
            env!("CARGO_PKG_NAME"),
            variant.suffix()
        ));
        let contents = render_desktop_entry(&template, DESKTOP_NAME, &icon);

        write_if_changed(&path, contents.as_bytes())
            .map_err(|e| BridgeError::DesktopEntry(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// Fill the `Name=` and `Icon=` keys of a desktop entry template
fn render_desktop_entry(template: &str, name: &str, icon: &str) -> String {
    let mut lines: Vec<String> = template
        .lines()
        .map(|line| match line {
            "Name=" => format!("Name={}", name),
            "Icon=" => format!("Icon={}", icon),
            other => other.to_string(),
        })
        .collect();
    lines.push(String::new());
    lines.join("\n")
}

fn write_if_changed(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Ok(existing) = fs::read(path) {
        if existing == contents {
            return Ok(());
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!("Writing {}", path.display());
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_icon_written_once_per_variant() {
        let tmp = TempDir::new().unwrap();
        let cache = ResourceCache::new(tmp.path());

        let dark = cache.icon_path(IconVariant::Dark);
        let light = cache.icon_path(IconVariant::Light);

        assert!(dark.ends_with("cc-black.svg"));
        assert!(light.ends_with("cc-white.svg"));
        assert!(Path::new(&dark).exists());
        assert_eq!(cache.icon_path(IconVariant::Dark), dark);
    }

    #[test]
    fn test_desktop_entry_points_at_icon() {
        let tmp = TempDir::new().unwrap();
        let cache = ResourceCache::new(tmp.path());

        let entry = cache.desktop_entry(IconVariant::Light);
        let text = fs::read_to_string(&entry).unwrap();

        assert!(entry.ends_with("-light.desktop"));
        assert!(text.contains("Name=Cast Control"));
        assert!(text.contains(&format!("Icon={}", cache.icon_path(IconVariant::Light))));
    }

    #[test]
    fn test_stale_file_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("icon/cc-black.svg");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();

        let cache = ResourceCache::new(tmp.path());
        cache.icon_path(IconVariant::Dark);

        assert_ne!(fs::read_to_string(&path).unwrap(), "stale");
    }

    #[test]
    fn test_unwritable_dir_yields_sentinel() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not a dir").unwrap();

        let cache = ResourceCache::new(&blocker);
        assert_eq!(cache.icon_path(IconVariant::Dark), NO_ENTRY);
        assert_eq!(cache.desktop_entry(IconVariant::Dark), NO_ENTRY);
    }

    #[test]
    fn test_render_desktop_entry() {
        let rendered = render_desktop_entry("[Desktop Entry]\nName=\nIcon=", "X", "/i.svg");
        assert_eq!(rendered, "[Desktop Entry]\nName=X\nIcon=/i.svg\n");
    }
}
