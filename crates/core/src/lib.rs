#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod fixed;

use serde::{Deserialize, Serialize};

pub use fixed::{isqrt_u64, Fixed, FIXED_SCALE};

/// Local simulation rate (ticks per second) the client samples input at.
pub const DEFAULT_TICK_HZ: u32 = 144;

/// Player body radius in world units.
pub const PLAYER_RADIUS: f32 = 15.0;

/// Radius of the pillar at the centre of wave arenas, in world units.
pub const CENTRAL_PILLAR_RADIUS: f32 = 40.0;

/// Display names are clipped to this many characters before encoding.
pub const MAX_NAME_CHARS: usize = 18;

/// Hard ceiling on encoded name length (the length prefix is a single byte).
pub const MAX_NAME_BYTES: usize = 255;

/// Server-assigned player identifier.
pub type PlayerId = u32;

/// Sequence number stamped on every input the client sends.
///
/// Wraps at 2^32. Ordering uses serial-number arithmetic so that an
/// acknowledgment just past the wrap still covers inputs sent before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSeq(pub u32);

impl InputSeq {
    /// Value before any input has been acknowledged.
    pub const ZERO: Self = Self(0);

    /// First sequence number a fresh session sends.
    pub const FIRST: Self = Self(1);

    /// Next sequence number, wrapping at 2^32.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// True when `ack` covers this sequence number (`self <= ack` modulo 2^32).
    pub fn is_acked_by(self, ack: InputSeq) -> bool {
        ack.0.wrapping_sub(self.0) < 0x8000_0000
    }
}

/// Room a snapshot (or leaderboard entry) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Room {
    /// Shared lobby with portals.
    #[default]
    Lobby,
    /// Combat room; snapshots carry the extended wave block.
    Wave,
    /// Tag this client does not know about.
    Other(u8),
}

impl Room {
    /// Wire tag of the lobby.
    pub const LOBBY_TAG: u8 = 0;
    /// Wire tag of the combat room.
    pub const WAVE_TAG: u8 = 1;

    /// Map a wire tag to a room.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            Self::LOBBY_TAG => Room::Lobby,
            Self::WAVE_TAG => Room::Wave,
            other => Room::Other(other),
        }
    }

    /// Wire tag for this room.
    pub fn tag(self) -> u8 {
        match self {
            Room::Lobby => Self::LOBBY_TAG,
            Room::Wave => Self::WAVE_TAG,
            Room::Other(tag) => tag,
        }
    }
}
