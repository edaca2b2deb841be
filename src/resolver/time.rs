//! Position, duration and seeking.
//!
//! The control surface counts in microseconds, the device in (fractional)
//! seconds. Conversions round to the nearest value in both directions.
//!
//! Live streams and some apps never report a duration. For those the
//! resolver reports the longest position seen so far, so the progress bar
//! never runs backwards within one stream. The cache is dropped on any pass
//! where the device has no meaningful position, which is how a new stream
//! shows up.

use anyhow::Result;

use super::Resolver;

pub type Microseconds = i64;

pub const US_IN_SEC: f64 = 1_000_000.0;

const BEGINNING: Microseconds = 0;
const NO_DURATION: Microseconds = 0;
const DEFAULT_RATE: f64 = 1.0;

/// Seconds to microseconds, rounded
pub fn to_microseconds(seconds: f64) -> Microseconds {
    (seconds * US_IN_SEC).round() as Microseconds
}

/// Microseconds to whole seconds, rounded
pub fn to_seconds(us: Microseconds) -> i64 {
    (us as f64 / US_IN_SEC).round() as i64
}

pub trait TimeResolver {
    /// Device position in seconds; `None` before playback starts
    fn current_time(&self) -> Option<f64>;

    fn current_position(&self) -> Microseconds;

    fn duration(&self) -> Microseconds;

    /// Position rounded to a tenth of a second is past the start
    fn has_current_time(&self) -> bool;

    fn reset_longest_duration(&self);

    fn seek(&self, position: Microseconds) -> Result<()>;

    fn rate(&self) -> f64;
}

impl TimeResolver for Resolver {
    fn current_time(&self) -> Option<f64> {
        let media = self.media()?;
        media
            .adjusted_current_time
            .filter(|t| *t != 0.0)
            .or(media.current_time)
            .filter(|t| *t != 0.0)
    }

    fn current_position(&self) -> Microseconds {
        self.current_time()
            .map(to_microseconds)
            .unwrap_or(BEGINNING)
    }

    fn duration(&self) -> Microseconds {
        if let Some(duration) = self.media().and_then(|m| m.duration) {
            return to_microseconds(duration);
        }

        let current = self.current_position();
        let mut cache = self.cache();

        match cache.longest_duration {
            Some(longest) if longest > current => longest,
            _ if current != BEGINNING => {
                cache.longest_duration = Some(current);
                current
            }
            _ => NO_DURATION,
        }
    }

    fn has_current_time(&self) -> bool {
        self.current_time()
            .map(|t| (t * 10.0).round() / 10.0 > 0.0)
            .unwrap_or(false)
    }

    fn reset_longest_duration(&self) {
        if !self.has_current_time() {
            self.cache().longest_duration = None;
        }
    }

    fn seek(&self, position: Microseconds) -> Result<()> {
        self.device.seek(to_seconds(position))
    }

    fn rate(&self) -> f64 {
        self.media()
            .and_then(|m| m.playback_rate)
            .filter(|r| *r != 0.0)
            .unwrap_or(DEFAULT_RATE)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::device::MediaStatus;
    use crate::resolver::testing::StubDevice;
    use crate::resources::ResourceCache;

    fn setup() -> (Arc<StubDevice>, Resolver) {
        let device = StubDevice::shared();
        let resolver = Resolver::new(
            device.clone(),
            Arc::new(ResourceCache::new("/nonexistent")),
            false,
        );
        (device, resolver)
    }

    fn at(current: f64) -> MediaStatus {
        MediaStatus {
            current_time: Some(current),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_duration_rounds() {
        let (device, resolver) = setup();
        device.set_media(MediaStatus {
            duration: Some(180.0),
            ..Default::default()
        });
        assert_eq!(resolver.duration(), 180_000_000);

        device.set_media(MediaStatus {
            duration: Some(0.000_000_6),
            ..Default::default()
        });
        assert_eq!(resolver.duration(), 1);
    }

    #[test]
    fn test_adjusted_time_preferred() {
        let (device, resolver) = setup();
        device.set_media(MediaStatus {
            current_time: Some(10.0),
            adjusted_current_time: Some(12.5),
            ..Default::default()
        });
        assert_eq!(resolver.current_position(), 12_500_000);
    }

    #[test]
    fn test_longest_duration_is_monotonic() {
        let (device, resolver) = setup();

        device.set_media(at(30.0));
        resolver.refresh();
        assert_eq!(resolver.duration(), 30_000_000);

        device.set_media(at(20.0));
        resolver.refresh();
        assert_eq!(resolver.duration(), 30_000_000);

        device.set_media(at(45.0));
        resolver.refresh();
        assert_eq!(resolver.duration(), 45_000_000);
    }

    #[test]
    fn test_gap_resets_longest_duration() {
        let (device, resolver) = setup();

        device.set_media(at(60.0));
        resolver.refresh();
        assert_eq!(resolver.duration(), 60_000_000);

        device.set_media(at(0.04));
        resolver.refresh();
        assert!(!resolver.has_current_time());

        device.set_media(at(5.0));
        resolver.refresh();
        assert_eq!(resolver.duration(), 5_000_000);
    }

    #[test]
    fn test_no_position_means_no_duration() {
        let (_device, resolver) = setup();
        assert_eq!(resolver.current_position(), 0);
        assert_eq!(resolver.duration(), 0);
        assert!(!resolver.has_current_time());
    }

    #[test]
    fn test_seek_rounds_to_seconds() {
        let (device, resolver) = setup();
        resolver.seek(41_500_000).unwrap();
        resolver.seek(41_499_999).unwrap();
        assert_eq!(device.calls(), vec!["seek 42", "seek 41"]);
    }

    #[test]
    fn test_rate_defaults() {
        let (device, resolver) = setup();
        assert_eq!(resolver.rate(), 1.0);
        device.set_media(MediaStatus {
            playback_rate: Some(2.0),
            ..Default::default()
        });
        assert_eq!(resolver.rate(), 2.0);
    }
}
