//! Error taxonomy for the bridge.
//!
//! A device that simply isn't on the network is not an error: the locator
//! returns `Ok(None)` and the supervisor retries. Only the conditions below
//! escape to callers.

use thiserror::Error;

/// Process exit codes used by the command line.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const NO_DEVICE: i32 = 1;
    pub const NOT_RUNNING: i32 = 2;
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Discovery failed and retrying was disabled.
    #[error("device {0} not found")]
    NoDevicesFound(String),

    /// A service command found no background instance.
    #[error("background service isn't running")]
    NotRunning,

    #[error("background service is already running (pid {0})")]
    AlreadyRunning(u32),

    /// The background process could not be started. Persisted args are
    /// rolled back before this is returned.
    #[error("failed to launch background service: {0}")]
    DaemonLaunch(String),

    #[error("couldn't resolve icon: {0}")]
    IconResolution(String),

    #[error("couldn't create desktop entry: {0}")]
    DesktopEntry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotRunning => exit_code::NOT_RUNNING,
            _ => exit_code::NO_DEVICE,
        }
    }
}

impl From<::config::ConfigError> for BridgeError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            BridgeError::NoDevicesFound("Kitchen".into()).exit_code(),
            exit_code::NO_DEVICE
        );
        assert_eq!(BridgeError::NotRunning.exit_code(), exit_code::NOT_RUNNING);
    }

    #[test]
    fn test_not_found_message_names_device() {
        let err = BridgeError::NoDevicesFound("Living Room".into());
        assert_eq!(err.to_string(), "device Living Room not found");
    }
}
