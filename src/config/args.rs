//! Connection arguments persisted for the background service.
//!
//! `service connect` saves them, the service process and `service reconnect`
//! read them back, `service disconnect` deletes them. One JSON file per
//! device identifier: `<state_dir>/<identifier>-args.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{get_state_dir, DEFAULT_LOG_LEVEL, DEFAULT_RETRY_WAIT};
use crate::device::locator::{DeviceQuery, DEFAULT_DEVICE_NAME};
use crate::error::BridgeError;

pub const ARGS_SUFFIX: &str = "-args.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionArgs {
    pub name: Option<String>,
    pub host: Option<String>,
    pub uuid: Option<String>,
    pub wait: Option<f64>,
    pub retry_wait: f64,
    pub icon: bool,
    pub log_level: String,
}

impl Default for ConnectionArgs {
    fn default() -> Self {
        Self {
            name: None,
            host: None,
            uuid: None,
            wait: None,
            retry_wait: DEFAULT_RETRY_WAIT,
            icon: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ConnectionArgs {
    pub fn query(&self) -> DeviceQuery {
        DeviceQuery {
            name: self.name.clone(),
            host: self.host.clone(),
            uuid: self.uuid.clone(),
        }
    }

    pub fn identifier(&self) -> String {
        identifier_for(&self.query())
    }
}

/// File-name-safe key for a device: name, else host, else uuid
pub fn identifier_for(query: &DeviceQuery) -> String {
    let cleaned = sanitized(&query.label());
    if cleaned.is_empty() {
        DEFAULT_DEVICE_NAME.to_string()
    } else {
        cleaned
    }
}

fn sanitized(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    cleaned.trim_matches('.').to_string()
}

/// Directory of persisted [`ConnectionArgs`]
#[derive(Debug, Clone)]
pub struct ArgsStore {
    dir: PathBuf,
}

impl Default for ArgsStore {
    fn default() -> Self {
        Self::new(get_state_dir())
    }
}

impl ArgsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}{}", identifier, ARGS_SUFFIX))
    }

    pub fn save(&self, args: &ConnectionArgs) -> Result<PathBuf, BridgeError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&args.identifier());
        fs::write(&path, serde_json::to_string_pretty(args)?)?;
        debug!("Saved connection args to {}", path.display());
        Ok(path)
    }

    /// Args for `identifier`, or the most recently saved args when `None`
    pub fn load(&self, identifier: Option<&str>) -> Result<Option<ConnectionArgs>, BridgeError> {
        let path = match identifier {
            Some(id) => self.path_for(id),
            None => match self.newest()? {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete(&self, identifier: &str) -> Result<bool, BridgeError> {
        match fs::remove_file(self.path_for(identifier)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every persisted args file, returning how many were removed
    pub fn delete_all(&self) -> Result<usize, BridgeError> {
        let mut removed = 0;
        for path in self.files()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Couldn't remove {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }

    fn files(&self) -> Result<Vec<PathBuf>, BridgeError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(ARGS_SUFFIX))
            })
            .collect())
    }

    fn newest(&self) -> Result<Option<PathBuf>, BridgeError> {
        let newest = self
            .files()?
            .into_iter()
            .max_by_key(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH)
            });
        Ok(newest)
    }
}
