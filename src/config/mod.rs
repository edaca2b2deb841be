//! Configuration management
//!
//! Settings come from built-in defaults, then an optional
//! `<config_dir>/config.{toml,json,yaml}`, then `CAST_BRIDGE_*` environment
//! variables. Command-line flags override the result.

mod args;

pub use args::{identifier_for, ArgsStore, ConnectionArgs, ARGS_SUFFIX};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

const APP_DIR_NAME: &str = "cast-bridge";

pub const DEFAULT_RETRY_WAIT: f64 = 5.0;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between discovery attempts; `None` gives up after one
    #[serde(default)]
    pub wait: Option<f64>,

    /// Seconds to wait after a dropped connection, also bounds each
    /// discovery pass
    #[serde(default = "default_retry_wait")]
    pub retry_wait: f64,

    #[serde(default)]
    pub light_icon: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_retry_wait() -> f64 {
    DEFAULT_RETRY_WAIT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait: None,
            retry_wait: DEFAULT_RETRY_WAIT,
            light_icon: false,
            log_level: default_log_level(),
        }
    }
}

/// Resolve a per-app directory: explicit env override, then the XDG
/// variable, then the platform default under $HOME, then `fallback`.
fn app_dir(override_var: &str, xdg_var: &str, home_suffix: &str, fallback: &str) -> PathBuf {
    if let Ok(dir) = std::env::var(override_var) {
        return PathBuf::from(dir);
    }

    #[cfg(target_os = "macos")]
    {
        let _ = (xdg_var, home_suffix);
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library/Application Support")
                .join(APP_DIR_NAME);
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        if let Ok(xdg) = std::env::var(xdg_var) {
            return PathBuf::from(xdg).join(APP_DIR_NAME);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(home_suffix).join(APP_DIR_NAME);
        }
    }

    PathBuf::from(fallback)
}

/// Get config directory (XDG_CONFIG_HOME or platform default)
pub fn get_config_dir() -> PathBuf {
    app_dir("CAST_BRIDGE_CONFIG_DIR", "XDG_CONFIG_HOME", ".config", ".")
}

/// Bundled icons and desktop entries are written here
pub fn get_data_dir() -> PathBuf {
    app_dir("CAST_BRIDGE_DATA_DIR", "XDG_DATA_HOME", ".local/share", "./data")
}

/// Pid file and persisted connection args
pub fn get_state_dir() -> PathBuf {
    app_dir("CAST_BRIDGE_STATE_DIR", "XDG_STATE_HOME", ".local/state", "./state")
}

pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CAST_BRIDGE_LOG_DIR") {
        return PathBuf::from(dir);
    }
    get_state_dir().join("log")
}

pub fn load_config() -> Result<Config, BridgeError> {
    let config_dir = get_config_dir();

    let config = ::config::Config::builder()
        .set_default("retry_wait", DEFAULT_RETRY_WAIT)?
        .set_default("light_icon", false)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // CAST_BRIDGE_RETRY_WAIT, CAST_BRIDGE_LOG_LEVEL, ...
        .add_source(
            ::config::Environment::with_prefix("CAST_BRIDGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
