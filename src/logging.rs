//! Process-wide tracing setup, applied once at startup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate and anything else logs at warn.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "cast-bridge.log";

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Filter for a `--log-level` value such as `info` or `DEBUG`
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.trim().to_lowercase();
        let level = match level.as_str() {
            "warning" => "warn",
            "critical" | "fatal" => "error",
            other => other,
        };
        EnvFilter::new(format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level))
    })
}

/// Foreground: human-readable output on stderr
pub fn init_foreground(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(level))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

/// Background service: plain text to `path`. The previous log is kept as
/// `<path>.1` and a fresh file started.
pub fn init_file(level: &str, path: &Path) -> io::Result<()> {
    let file = rotate_and_open(path)?;

    let _ = tracing_subscriber::registry()
        .with(filter_for(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init();
    Ok(())
}

fn rotate_and_open(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        let mut rotated = path.as_os_str().to_owned();
        rotated.push(".1");
        fs::rename(path, PathBuf::from(rotated))?;
    }
    File::create(path)
}
