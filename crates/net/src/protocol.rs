//! Protocol message definitions for client-server communication.
//!
//! Every message is a fixed little-endian layout behind a one-byte tag; see
//! [`crate::codec`] for the byte-level format.

use arena_core::{Fixed, InputSeq, PlayerId, Room};
use std::fmt;

/// Client → server: one input sample.
pub const C2S_INPUT: u8 = 1;
/// Client → server: step into a lobby portal.
pub const C2S_ENTER_PORTAL: u8 = 2;
/// Client → server: announce a display name.
pub const C2S_SET_NAME: u8 = 3;
/// Client → server: invite another player to a party.
pub const C2S_PARTY_INVITE: u8 = 4;
/// Client → server: answer a party invite.
pub const C2S_PARTY_INVITE_RESPONSE: u8 = 5;
/// Client → server: leave the current party.
pub const C2S_PARTY_LEAVE: u8 = 6;

/// Server → client: assigned player id.
pub const S2C_WELCOME: u8 = 10;
/// Server → client: authoritative world state.
pub const S2C_SNAPSHOT: u8 = 11;
/// Server → client: combat-room dimensions.
pub const S2C_WAVE_DEF: u8 = 12;
/// Server → client: player standings.
pub const S2C_LEADERBOARD: u8 = 13;
/// Server → client: incoming party invite.
pub const S2C_PARTY_INVITE: u8 = 20;
/// Server → client: party membership.
pub const S2C_PARTY_UPDATE: u8 = 21;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Input sample for one local tick.
    Input(InputMessage),

    /// Request to enter a lobby portal.
    EnterPortal {
        /// Portal identifier from the lobby map.
        portal_id: u8,
    },

    /// Display name announcement.
    SetName {
        /// Name; clipped to 18 characters when encoded.
        name: String,
    },

    /// Invite another player into our party.
    PartyInvite {
        /// Player to invite.
        target_id: PlayerId,
    },

    /// Accept or decline a pending invite.
    PartyInviteResponse {
        /// Player who sent the invite.
        from_id: PlayerId,
        /// Whether the invite was accepted.
        accept: bool,
    },

    /// Leave the current party.
    PartyLeave,
}

/// Input message as it travels on the wire.
///
/// The mouse vector carries raw fixed-point values (world units × 1000) so the
/// server steps with exactly the integers the client predicted with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputMessage {
    /// Sequence number of this input.
    pub seq: InputSeq,
    /// Bit 0 = up, 1 = down, 2 = left, 3 = right.
    pub direction_bits: u8,
    /// Mouse steering active.
    pub mouse_active: bool,
    /// Mouse offset X as a raw fixed-point value.
    pub mouse_dx: f32,
    /// Mouse offset Y as a raw fixed-point value.
    pub mouse_dy: f32,
}

impl InputMessage {
    /// Mouse offset from a fixed-point sample.
    pub fn mouse_from_fixed(dx: Fixed, dy: Fixed) -> (f32, f32) {
        (dx.raw() as f32, dy.raw() as f32)
    }

    /// Mouse offset back in fixed-point, truncated toward zero.
    pub fn mouse_fixed(&self) -> (Fixed, Fixed) {
        (Fixed(self.mouse_dx as i32), Fixed(self.mouse_dy as i32))
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Handshake: the id the server assigned to us.
    Welcome {
        /// Our player id.
        your_id: PlayerId,
    },

    /// Combat-room dimensions for the current wave.
    WaveDef(WaveDef),

    /// Authoritative world state for one server tick.
    Snapshot(Snapshot),

    /// Another player invited us to their party.
    PartyInvite {
        /// Inviting player.
        from_id: PlayerId,
        /// Inviting player's display name.
        from_name: String,
    },

    /// Party membership changed.
    PartyUpdate(PartyUpdate),

    /// Current standings.
    Leaderboard(Vec<LeaderboardEntry>),

    /// Message with a tag this client does not understand.
    Unknown {
        /// The raw leading tag byte.
        tag: u8,
    },
}

impl ServerMessage {
    /// Kind of this message (for logging).
    pub fn kind(&self) -> MessageKind {
        match self {
            ServerMessage::Welcome { .. } => MessageKind::Welcome,
            ServerMessage::WaveDef(_) => MessageKind::WaveDef,
            ServerMessage::Snapshot(_) => MessageKind::Snapshot,
            ServerMessage::PartyInvite { .. } => MessageKind::PartyInvite,
            ServerMessage::PartyUpdate(_) => MessageKind::PartyUpdate,
            ServerMessage::Leaderboard(_) => MessageKind::Leaderboard,
            ServerMessage::Unknown { tag } => MessageKind::Unknown(*tag),
        }
    }
}

/// Identifies a message family, e.g. in decode errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Client input.
    Input,
    /// Portal request.
    EnterPortal,
    /// Name announcement.
    SetName,
    /// Party invite (either direction).
    PartyInvite,
    /// Invite answer.
    PartyInviteResponse,
    /// Party leave.
    PartyLeave,
    /// Handshake.
    Welcome,
    /// Wave dimensions.
    WaveDef,
    /// World snapshot.
    Snapshot,
    /// Party membership.
    PartyUpdate,
    /// Standings.
    Leaderboard,
    /// Unrecognized tag.
    Unknown(u8),
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Unknown(tag) => write!(f, "unknown({tag})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Dimensions of the combat arena for one wave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveDef {
    /// Wave number (1-based).
    pub wave_number: u16,
    /// Arena half size in world units.
    pub half_size: f32,
    /// Radius of hostile entities.
    pub entity_radius: f32,
    /// Margin kept clear of walls when spawning.
    pub spawn_margin: f32,
}

/// One server tick of world state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Server tick number.
    pub tick: u32,
    /// Room this snapshot describes.
    pub room: Room,
    /// Players in the room, in server order.
    pub players: Vec<PlayerState>,
    /// Extra state present only in the combat room.
    pub wave: Option<WaveState>,
}

impl Snapshot {
    /// Look up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// Player record inside a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Player id.
    pub id: PlayerId,
    /// Position X in world units.
    pub x: f32,
    /// Position Y in world units.
    pub y: f32,
    /// Alive flag.
    pub alive: bool,
    /// Hit points.
    pub hp: u8,
    /// Display name.
    pub name: String,
    /// Fixed-point simulation state, when the server provides it.
    pub authority: PlayerAuthority,
}

/// Authoritative fixed-point fields for the local player.
///
/// The current wire layout never carries these, so decoding leaves every field
/// `None`; reconciliation then derives what it can from the float position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerAuthority {
    /// Exact fixed-point position.
    pub position: Option<(Fixed, Fixed)>,
    /// Slide carried into the next tick.
    pub slide: Option<(Fixed, Fixed)>,
    /// Current slow multiplier.
    pub slow_mul: Option<Fixed>,
    /// Highest input sequence applied by the server.
    pub last_input_seq: Option<InputSeq>,
}

/// Extended combat-room block of a snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveState {
    /// Turret heading in radians.
    pub turret_angle: f32,
    /// Turret opacity.
    pub turret_alpha: f32,
    /// Wave phase.
    pub phase: u8,
    /// Wave sub-phase.
    pub subphase: u8,
    /// Seconds until the wave starts.
    pub countdown_remaining: f32,
    /// Seconds left in the wave.
    pub time_remaining: f32,
    /// Total wave duration in seconds.
    pub time_total: f32,
    /// Wave number.
    pub wave_number: u16,
    /// Transient entities (projectiles, hazards).
    pub entities: Vec<WaveEntity>,
}

/// Transient combat-room entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveEntity {
    /// Entity id.
    pub id: u32,
    /// Kind tag.
    pub kind: u8,
    /// Kind-specific flags.
    pub flags: u8,
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Collision radius.
    pub radius: f32,
}

/// Party membership update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartyUpdate {
    /// Party id (0 = none).
    pub party_id: u32,
    /// Party leader.
    pub leader_id: PlayerId,
    /// Members in server order.
    pub members: Vec<PlayerId>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Player id.
    pub id: PlayerId,
    /// Room the player is in.
    pub room: Room,
    /// Highest wave reached.
    pub wave_number: u16,
    /// Party id (0 = solo).
    pub party_id: u32,
    /// Display name.
    pub name: String,
}
