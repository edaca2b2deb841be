//! Capability flags. Everything reads the latest media status and is false
//! until one arrives.

use super::{MetadataResolver, Resolver};
use crate::device::MediaStatus;
use crate::surface::PlayState;

pub trait AbilityQuery {
    fn can_quit(&self) -> bool {
        true
    }

    fn can_control(&self) -> bool {
        true
    }

    fn can_edit_tracks(&self) -> bool {
        false
    }

    /// Something is loaded that play/pause can act on
    fn can_play(&self) -> bool;

    fn can_pause(&self) -> bool;

    fn can_seek(&self) -> bool;

    fn can_go_next(&self) -> bool;

    fn can_go_previous(&self) -> bool;
}

impl Resolver {
    fn media_flag(&self, flag: fn(&MediaStatus) -> bool) -> bool {
        self.media().map(|m| flag(&m)).unwrap_or(false)
    }
}

impl AbilityQuery for Resolver {
    fn can_play(&self) -> bool {
        self.playstate() != PlayState::Stopped
    }

    fn can_pause(&self) -> bool {
        self.media_flag(|m| m.supports_pause)
    }

    fn can_seek(&self) -> bool {
        self.media_flag(|m| m.supports_seek)
    }

    fn can_go_next(&self) -> bool {
        self.media_flag(|m| m.supports_queue_next)
    }

    fn can_go_previous(&self) -> bool {
        self.media_flag(|m| m.supports_queue_prev)
    }
}
