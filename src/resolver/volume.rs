//! Volume and mute.
//!
//! Receivers only accept relative volume steps, and reject a step of zero.

use anyhow::Result;
use tracing::debug;

use super::Resolver;

pub trait VolumeController {
    /// Receiver volume in 0.0..=1.0, unknown before the first cast status
    fn volume(&self) -> Option<f64>;

    /// Move towards `target`. No-op when the current volume is unknown or
    /// already equal to the target.
    fn set_volume(&self, target: f64) -> Result<()>;

    fn is_muted(&self) -> bool;

    fn set_muted(&self, muted: bool) -> Result<()>;
}

impl VolumeController for Resolver {
    fn volume(&self) -> Option<f64> {
        self.cast().map(|c| c.volume_level)
    }

    fn set_volume(&self, target: f64) -> Result<()> {
        let Some(current) = self.volume() else {
            debug!("Volume unknown, ignoring set_volume({})", target);
            return Ok(());
        };

        let delta = target - current;
        if delta > 0.0 {
            self.device.volume_up(delta)
        } else if delta < 0.0 {
            self.device.volume_down(delta.abs())
        } else {
            Ok(())
        }
    }

    fn is_muted(&self) -> bool {
        if let Some(cast) = self.cast() {
            return cast.volume_muted;
        }
        self.media()
            .and_then(|m| m.volume_muted)
            .unwrap_or(false)
    }

    fn set_muted(&self, muted: bool) -> Result<()> {
        self.device.set_volume_muted(muted)
    }
}
