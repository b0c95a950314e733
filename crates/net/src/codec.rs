//! Byte-level encoding and decoding of protocol messages.
//!
//! Layout: `[tag: u8][fields...]`, little-endian, no framing (the transport
//! delivers one message per WebSocket frame). Decoders never panic: truncated
//! input yields a [`DecodeError`] naming the message kind, and unknown tags
//! decode to [`ServerMessage::Unknown`].

use crate::protocol::*;
use arena_core::{InputSeq, Room, MAX_NAME_BYTES, MAX_NAME_CHARS};
use bytes::{Buf, BufMut};
use thiserror::Error;

const INPUT_LEN: usize = 1 + 4 + 1 + 1 + 4 + 4;
const WAVE_DEF_LEN: usize = 1 + 2 + 4 + 4 + 4;
const PARTY_UPDATE_HEADER_LEN: usize = 1 + 4 + 4 + 2;
const LEADERBOARD_ENTRY_FIXED_LEN: usize = 4 + 1 + 2 + 4 + 1;

/// Decoding failures. None of them are fatal to the connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length buffer (no tag byte).
    #[error("empty message")]
    Empty,
    /// Buffer ended inside a fixed-size field.
    #[error("{kind} message truncated")]
    Short {
        /// Message being decoded.
        kind: MessageKind,
    },
    /// Buffer ended inside a name string.
    #[error("{kind} message truncated inside a name")]
    ShortName {
        /// Message being decoded.
        kind: MessageKind,
    },
    /// Client-direction tag this codec does not know.
    #[error("unknown client message tag {0}")]
    UnknownTag(u8),
}

impl DecodeError {
    /// Message kind the error refers to, if known.
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            DecodeError::Short { kind } | DecodeError::ShortName { kind } => Some(*kind),
            DecodeError::UnknownTag(tag) => Some(MessageKind::Unknown(*tag)),
            DecodeError::Empty => None,
        }
    }
}

/// Encode a client message. Never fails; names are clipped as needed.
pub fn encode_client_message(msg: &ClientMessage) -> Vec<u8> {
    match msg {
        ClientMessage::Input(input) => {
            let mut buf = Vec::with_capacity(INPUT_LEN);
            buf.put_u8(C2S_INPUT);
            buf.put_u32_le(input.seq.0);
            buf.put_u8(input.direction_bits);
            buf.put_u8(input.mouse_active as u8);
            buf.put_f32_le(input.mouse_dx);
            buf.put_f32_le(input.mouse_dy);
            buf
        }
        ClientMessage::EnterPortal { portal_id } => vec![C2S_ENTER_PORTAL, *portal_id],
        ClientMessage::SetName { name } => {
            let clipped = clip_chars(name, MAX_NAME_CHARS);
            let mut buf = Vec::with_capacity(2 + clipped.len());
            buf.put_u8(C2S_SET_NAME);
            put_name(&mut buf, clipped);
            buf
        }
        ClientMessage::PartyInvite { target_id } => {
            let mut buf = Vec::with_capacity(5);
            buf.put_u8(C2S_PARTY_INVITE);
            buf.put_u32_le(*target_id);
            buf
        }
        ClientMessage::PartyInviteResponse { from_id, accept } => {
            let mut buf = Vec::with_capacity(6);
            buf.put_u8(C2S_PARTY_INVITE_RESPONSE);
            buf.put_u32_le(*from_id);
            buf.put_u8(*accept as u8);
            buf
        }
        ClientMessage::PartyLeave => vec![C2S_PARTY_LEAVE],
    }
}

/// Decode a client message (server side, tests and tooling).
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, DecodeError> {
    let (&tag, body) = data.split_first().ok_or(DecodeError::Empty)?;
    let mut r = Reader::new(body);
    match tag {
        C2S_INPUT => {
            let short = DecodeError::Short {
                kind: MessageKind::Input,
            };
            if data.len() < INPUT_LEN {
                return Err(short);
            }
            Ok(ClientMessage::Input(InputMessage {
                seq: InputSeq(r.u32().ok_or(short)?),
                direction_bits: r.u8().ok_or(short)?,
                mouse_active: r.u8().ok_or(short)? != 0,
                mouse_dx: r.f32().ok_or(short)?,
                mouse_dy: r.f32().ok_or(short)?,
            }))
        }
        C2S_ENTER_PORTAL => {
            let portal_id = r.u8().ok_or(DecodeError::Short {
                kind: MessageKind::EnterPortal,
            })?;
            Ok(ClientMessage::EnterPortal { portal_id })
        }
        C2S_SET_NAME => {
            let name = r.name(MessageKind::SetName)?;
            Ok(ClientMessage::SetName { name })
        }
        C2S_PARTY_INVITE => {
            let target_id = r.u32().ok_or(DecodeError::Short {
                kind: MessageKind::PartyInvite,
            })?;
            Ok(ClientMessage::PartyInvite { target_id })
        }
        C2S_PARTY_INVITE_RESPONSE => {
            let short = DecodeError::Short {
                kind: MessageKind::PartyInviteResponse,
            };
            let from_id = r.u32().ok_or(short)?;
            let accept = r.u8().ok_or(short)? != 0;
            Ok(ClientMessage::PartyInviteResponse { from_id, accept })
        }
        C2S_PARTY_LEAVE => Ok(ClientMessage::PartyLeave),
        other => Err(DecodeError::UnknownTag(other)),
    }
}

/// Encode a server message (used by tests and local fake servers).
pub fn encode_server_message(msg: &ServerMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        ServerMessage::Welcome { your_id } => {
            buf.put_u8(S2C_WELCOME);
            buf.put_u32_le(*your_id);
        }
        ServerMessage::WaveDef(def) => {
            buf.put_u8(S2C_WAVE_DEF);
            buf.put_u16_le(def.wave_number);
            buf.put_f32_le(def.half_size);
            buf.put_f32_le(def.entity_radius);
            buf.put_f32_le(def.spawn_margin);
        }
        ServerMessage::Snapshot(snapshot) => {
            buf.put_u8(S2C_SNAPSHOT);
            put_snapshot(&mut buf, snapshot);
        }
        ServerMessage::PartyInvite { from_id, from_name } => {
            buf.put_u8(S2C_PARTY_INVITE);
            buf.put_u32_le(*from_id);
            put_name(&mut buf, from_name);
        }
        ServerMessage::PartyUpdate(update) => {
            let count = update.members.len().min(u16::MAX as usize);
            buf.put_u8(S2C_PARTY_UPDATE);
            buf.put_u32_le(update.party_id);
            buf.put_u32_le(update.leader_id);
            buf.put_u16_le(count as u16);
            for member in &update.members[..count] {
                buf.put_u32_le(*member);
            }
        }
        ServerMessage::Leaderboard(entries) => {
            let count = entries.len().min(u16::MAX as usize);
            buf.put_u8(S2C_LEADERBOARD);
            buf.put_u16_le(count as u16);
            for entry in &entries[..count] {
                buf.put_u32_le(entry.id);
                buf.put_u8(entry.room.tag());
                buf.put_u16_le(entry.wave_number);
                buf.put_u32_le(entry.party_id);
                put_name(&mut buf, &entry.name);
            }
        }
        ServerMessage::Unknown { tag } => buf.put_u8(*tag),
    }
    buf
}

/// Decode a server message.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, DecodeError> {
    let (&tag, body) = data.split_first().ok_or(DecodeError::Empty)?;
    let mut r = Reader::new(body);
    match tag {
        S2C_WELCOME => {
            let your_id = r.u32().ok_or(DecodeError::Short {
                kind: MessageKind::Welcome,
            })?;
            Ok(ServerMessage::Welcome { your_id })
        }
        S2C_WAVE_DEF => {
            let short = DecodeError::Short {
                kind: MessageKind::WaveDef,
            };
            if data.len() < WAVE_DEF_LEN {
                return Err(short);
            }
            Ok(ServerMessage::WaveDef(WaveDef {
                wave_number: r.u16().ok_or(short)?,
                half_size: r.f32().ok_or(short)?,
                entity_radius: r.f32().ok_or(short)?,
                spawn_margin: r.f32().ok_or(short)?,
            }))
        }
        S2C_SNAPSHOT => decode_snapshot(&mut r).map(ServerMessage::Snapshot),
        S2C_PARTY_INVITE => {
            let from_id = r.u32().ok_or(DecodeError::Short {
                kind: MessageKind::PartyInvite,
            })?;
            let from_name = r.name(MessageKind::PartyInvite)?;
            Ok(ServerMessage::PartyInvite { from_id, from_name })
        }
        S2C_PARTY_UPDATE => {
            let short = DecodeError::Short {
                kind: MessageKind::PartyUpdate,
            };
            if data.len() < PARTY_UPDATE_HEADER_LEN {
                return Err(short);
            }
            let party_id = r.u32().ok_or(short)?;
            let leader_id = r.u32().ok_or(short)?;
            let count = r.u16().ok_or(short)?;
            let mut members = Vec::with_capacity((count as usize).min(r.remaining() / 4));
            for _ in 0..count {
                match r.u32() {
                    Some(id) => members.push(id),
                    None => break,
                }
            }
            Ok(ServerMessage::PartyUpdate(PartyUpdate {
                party_id,
                leader_id,
                members,
            }))
        }
        S2C_LEADERBOARD => {
            let count = r.u16().ok_or(DecodeError::Short {
                kind: MessageKind::Leaderboard,
            })?;
            let mut entries = Vec::new();
            for _ in 0..count {
                match read_leaderboard_entry(&mut r) {
                    Some(entry) => entries.push(entry),
                    None => break,
                }
            }
            Ok(ServerMessage::Leaderboard(entries))
        }
        other => Ok(ServerMessage::Unknown { tag: other }),
    }
}

fn put_snapshot(buf: &mut Vec<u8>, snapshot: &Snapshot) {
    let count = snapshot.players.len().min(u16::MAX as usize);
    buf.put_u32_le(snapshot.tick);
    buf.put_u8(snapshot.room.tag());
    buf.put_u16_le(count as u16);
    for player in &snapshot.players[..count] {
        buf.put_u32_le(player.id);
        buf.put_f32_le(player.x);
        buf.put_f32_le(player.y);
        buf.put_u8(player.alive as u8);
        buf.put_u8(player.hp);
        put_name(buf, &player.name);
    }
    if snapshot.room != Room::Wave {
        return;
    }
    let default_wave = WaveState::default();
    let wave = snapshot.wave.as_ref().unwrap_or(&default_wave);
    let entity_count = wave.entities.len().min(u16::MAX as usize);
    buf.put_f32_le(wave.turret_angle);
    buf.put_f32_le(wave.turret_alpha);
    buf.put_u8(wave.phase);
    buf.put_u8(wave.subphase);
    buf.put_f32_le(wave.countdown_remaining);
    buf.put_f32_le(wave.time_remaining);
    buf.put_f32_le(wave.time_total);
    buf.put_u16_le(wave.wave_number);
    buf.put_u16_le(entity_count as u16);
    for entity in &wave.entities[..entity_count] {
        buf.put_u32_le(entity.id);
        buf.put_u8(entity.kind);
        buf.put_u8(entity.flags);
        buf.put_f32_le(entity.x);
        buf.put_f32_le(entity.y);
        buf.put_f32_le(entity.radius);
    }
}

fn decode_snapshot(r: &mut Reader<'_>) -> Result<Snapshot, DecodeError> {
    let short = DecodeError::Short {
        kind: MessageKind::Snapshot,
    };
    let tick = r.u32().ok_or(short)?;
    let room = Room::from_tag(r.u8().ok_or(short)?);
    let count = r.u16().ok_or(short)?;

    let mut players = Vec::new();
    for _ in 0..count {
        let id = r.u32().ok_or(short)?;
        let x = r.f32().ok_or(short)?;
        let y = r.f32().ok_or(short)?;
        let alive = r.u8().ok_or(short)? != 0;
        let hp = r.u8().ok_or(short)?;
        let name = r.name(MessageKind::Snapshot)?;
        players.push(PlayerState {
            id,
            x,
            y,
            alive,
            hp,
            name,
            authority: PlayerAuthority::default(),
        });
    }

    let wave = if room == Room::Wave {
        let turret_angle = r.f32().ok_or(short)?;
        let turret_alpha = r.f32().ok_or(short)?;
        let phase = r.u8().ok_or(short)?;
        let subphase = r.u8().ok_or(short)?;
        let countdown_remaining = r.f32().ok_or(short)?;
        let time_remaining = r.f32().ok_or(short)?;
        let time_total = r.f32().ok_or(short)?;
        let wave_number = r.u16().ok_or(short)?;
        let entity_count = r.u16().ok_or(short)?;
        let mut entities = Vec::new();
        for _ in 0..entity_count {
            entities.push(WaveEntity {
                id: r.u32().ok_or(short)?,
                kind: r.u8().ok_or(short)?,
                flags: r.u8().ok_or(short)?,
                x: r.f32().ok_or(short)?,
                y: r.f32().ok_or(short)?,
                radius: r.f32().ok_or(short)?,
            });
        }
        Some(WaveState {
            turret_angle,
            turret_alpha,
            phase,
            subphase,
            countdown_remaining,
            time_remaining,
            time_total,
            wave_number,
            entities,
        })
    } else {
        None
    };

    Ok(Snapshot {
        tick,
        room,
        players,
        wave,
    })
}

fn read_leaderboard_entry(r: &mut Reader<'_>) -> Option<LeaderboardEntry> {
    if r.remaining() < LEADERBOARD_ENTRY_FIXED_LEN {
        return None;
    }
    let id = r.u32()?;
    let room = Room::from_tag(r.u8()?);
    let wave_number = r.u16()?;
    let party_id = r.u32()?;
    let name = r.name(MessageKind::Leaderboard).ok()?;
    Some(LeaderboardEntry {
        id,
        room,
        wave_number,
        party_id,
        name,
    })
}

/// Write `[len: u8][utf-8 bytes]`, clipping at 255 bytes on a char boundary.
fn put_name(buf: &mut Vec<u8>, name: &str) {
    let mut end = name.len().min(MAX_NAME_BYTES);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_u8(end as u8);
    buf.put_slice(&name.as_bytes()[..end]);
}

fn clip_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Bounds-checked little-endian reader.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn u8(&mut self) -> Option<u8> {
        (self.buf.remaining() >= 1).then(|| self.buf.get_u8())
    }

    fn u16(&mut self) -> Option<u16> {
        (self.buf.remaining() >= 2).then(|| self.buf.get_u16_le())
    }

    fn u32(&mut self) -> Option<u32> {
        (self.buf.remaining() >= 4).then(|| self.buf.get_u32_le())
    }

    fn f32(&mut self) -> Option<f32> {
        (self.buf.remaining() >= 4).then(|| self.buf.get_f32_le())
    }

    /// `[len: u8][bytes]` decoded as lossy UTF-8.
    fn name(&mut self, kind: MessageKind) -> Result<String, DecodeError> {
        let len = self.u8().ok_or(DecodeError::Short { kind })? as usize;
        if self.buf.len() < len {
            return Err(DecodeError::ShortName { kind });
        }
        let (bytes, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
