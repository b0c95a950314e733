//! Fuzz-style property tests for the wire codec
//!
//! Decoders must handle arbitrary or truncated network input without panicking,
//! and every outbound message must survive an encode/decode round trip.

use arena_core::{InputSeq, Room};
use arena_net::{
    decode_client_message, decode_server_message, encode_client_message, encode_server_message,
    ClientMessage, DecodeError, InputMessage, LeaderboardEntry, MessageKind, PartyUpdate,
    PlayerAuthority, PlayerState, ServerMessage, Snapshot, WaveEntity, WaveState,
};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f32> {
    -1.0e6f32..1.0e6f32
}

fn short_name() -> impl Strategy<Value = String> {
    "\\PC{0,18}"
}

fn client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        (any::<u32>(), 0u8..16, any::<bool>(), finite(), finite()).prop_map(
            |(seq, direction_bits, mouse_active, mouse_dx, mouse_dy)| {
                ClientMessage::Input(InputMessage {
                    seq: InputSeq(seq),
                    direction_bits,
                    mouse_active,
                    mouse_dx,
                    mouse_dy,
                })
            }
        ),
        any::<u8>().prop_map(|portal_id| ClientMessage::EnterPortal { portal_id }),
        short_name().prop_map(|name| ClientMessage::SetName { name }),
        any::<u32>().prop_map(|target_id| ClientMessage::PartyInvite { target_id }),
        (any::<u32>(), any::<bool>())
            .prop_map(|(from_id, accept)| ClientMessage::PartyInviteResponse { from_id, accept }),
        Just(ClientMessage::PartyLeave),
    ]
}

fn player() -> impl Strategy<Value = PlayerState> {
    (any::<u32>(), finite(), finite(), any::<bool>(), any::<u8>(), "\\PC{0,40}").prop_map(
        |(id, x, y, alive, hp, name)| PlayerState {
            id,
            x,
            y,
            alive,
            hp,
            name,
            authority: PlayerAuthority::default(),
        },
    )
}

fn entity() -> impl Strategy<Value = WaveEntity> {
    (any::<u32>(), any::<u8>(), any::<u8>(), finite(), finite(), finite()).prop_map(
        |(id, kind, flags, x, y, radius)| WaveEntity {
            id,
            kind,
            flags,
            x,
            y,
            radius,
        },
    )
}

fn wave_snapshot() -> impl Strategy<Value = Snapshot> {
    (
        any::<u32>(),
        prop::collection::vec(player(), 0..4),
        prop::collection::vec(entity(), 0..4),
        any::<u16>(),
        finite(),
    )
        .prop_map(|(tick, players, entities, wave_number, time)| Snapshot {
            tick,
            room: Room::Wave,
            players,
            wave: Some(WaveState {
                turret_angle: time / 7.0,
                turret_alpha: 1.0,
                phase: 1,
                subphase: 2,
                countdown_remaining: 0.0,
                time_remaining: time,
                time_total: time * 2.0,
                wave_number,
                entities,
            }),
        })
}

/// One representative message of every inbound kind.
fn inbound_samples() -> Vec<ServerMessage> {
    let player = PlayerState {
        id: 3,
        x: 10.0,
        y: -20.0,
        alive: true,
        hp: 5,
        name: "hotel".to_string(),
        authority: PlayerAuthority::default(),
    };
    vec![
        ServerMessage::Welcome { your_id: 3 },
        ServerMessage::WaveDef(arena_net::WaveDef {
            wave_number: 2,
            half_size: 300.0,
            entity_radius: 10.0,
            spawn_margin: 25.0,
        }),
        ServerMessage::Snapshot(Snapshot {
            tick: 40,
            room: Room::Lobby,
            players: vec![player.clone(), player.clone()],
            wave: None,
        }),
        ServerMessage::Snapshot(Snapshot {
            tick: 41,
            room: Room::Wave,
            players: vec![player],
            wave: Some(WaveState {
                wave_number: 2,
                entities: vec![WaveEntity {
                    id: 1,
                    kind: 2,
                    flags: 0,
                    x: 1.0,
                    y: 2.0,
                    radius: 3.0,
                }],
                ..WaveState::default()
            }),
        }),
        ServerMessage::PartyInvite {
            from_id: 9,
            from_name: "india".to_string(),
        },
        ServerMessage::PartyUpdate(PartyUpdate {
            party_id: 4,
            leader_id: 9,
            members: vec![9, 3, 12],
        }),
        ServerMessage::Leaderboard(vec![
            LeaderboardEntry {
                id: 9,
                room: Room::Wave,
                wave_number: 7,
                party_id: 4,
                name: "juliett".to_string(),
            },
            LeaderboardEntry {
                id: 3,
                room: Room::Lobby,
                wave_number: 1,
                party_id: 0,
                name: "kilo".to_string(),
            },
        ]),
    ]
}

fn is_prefix<T: PartialEq>(prefix: &[T], full: &[T]) -> bool {
    prefix.len() <= full.len() && prefix.iter().zip(full).all(|(a, b)| a == b)
}

proptest! {
    /// Property: Arbitrary bytes don't crash client decoder
    #[test]
    fn arbitrary_bytes_dont_crash_client(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_client_message(&random_bytes);
    }

    /// Property: Arbitrary bytes don't crash server decoder
    #[test]
    fn arbitrary_bytes_dont_crash_server(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = decode_server_message(&random_bytes);
    }

    /// Property: Every outbound message roundtrips
    #[test]
    fn client_messages_roundtrip(msg in client_message()) {
        let encoded = encode_client_message(&msg);
        let decoded = decode_client_message(&encoded).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    /// Property: SetName never exceeds the character or byte limit
    #[test]
    fn set_name_is_clipped(name in "\\PC{0,300}") {
        let encoded = encode_client_message(&ClientMessage::SetName { name: name.clone() });
        prop_assert_eq!(encoded.len(), 2 + encoded[1] as usize);
        match decode_client_message(&encoded).unwrap() {
            ClientMessage::SetName { name: decoded } => {
                prop_assert!(decoded.chars().count() <= 18);
                prop_assert!(name.starts_with(&decoded));
            }
            other => prop_assert!(false, "expected SetName, got {:?}", other),
        }
    }

    /// Property: Combat-room snapshots roundtrip
    #[test]
    fn wave_snapshots_roundtrip(snapshot in wave_snapshot()) {
        let msg = ServerMessage::Snapshot(snapshot);
        let decoded = decode_server_message(&encode_server_message(&msg)).unwrap();
        prop_assert_eq!(msg, decoded);
    }

    /// Property: Unknown tags decode to an explicit value
    #[test]
    fn unknown_tags_are_values(
        tag in any::<u8>().prop_filter("known tag", |t| ![10u8, 11, 12, 13, 20, 21].contains(t)),
        body in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut frame = vec![tag];
        frame.extend(body);
        prop_assert_eq!(decode_server_message(&frame), Ok(ServerMessage::Unknown { tag }));
    }

    /// Property: Corrupted payload handled
    #[test]
    fn corrupted_payload_handled(
        flip_pos in 0usize..64,
        flip_bit in 0u8..8,
    ) {
        for msg in inbound_samples() {
            let mut encoded = encode_server_message(&msg);
            if flip_pos < encoded.len() {
                encoded[flip_pos] ^= 1 << flip_bit;
                let _result = decode_server_message(&encoded);
            }
        }
    }
}

#[test]
fn truncation_at_every_offset_is_reported_or_prefix() {
    for msg in inbound_samples() {
        let encoded = encode_server_message(&msg);
        let kind = msg.kind();
        for cut in 0..encoded.len() {
            match decode_server_message(&encoded[..cut]) {
                Err(DecodeError::Empty) => assert_eq!(cut, 0),
                Err(DecodeError::Short { kind: k } | DecodeError::ShortName { kind: k }) => {
                    assert_eq!(k, kind, "wrong kind at cut {cut}")
                }
                Err(other) => panic!("unexpected {other:?} at cut {cut}"),
                Ok(partial) => match (&partial, &msg) {
                    (ServerMessage::PartyUpdate(p), ServerMessage::PartyUpdate(full)) => {
                        assert!(is_prefix(&p.members, &full.members))
                    }
                    (ServerMessage::Leaderboard(p), ServerMessage::Leaderboard(full)) => {
                        assert!(is_prefix(p, full))
                    }
                    _ => panic!("truncated {kind} decoded as {partial:?} at cut {cut}"),
                },
            }
        }
        assert_eq!(decode_server_message(&encoded), Ok(msg));
    }
}

#[test]
fn snapshot_name_truncation_is_distinguished() {
    let msg = &inbound_samples()[2];
    let encoded = encode_server_message(msg);
    // 8-byte header, 15 bytes of player fields up to the name; cut inside "hotel"
    let cut = 8 + 15 + 2;
    assert_eq!(
        decode_server_message(&encoded[..cut]),
        Err(DecodeError::ShortName {
            kind: MessageKind::Snapshot
        })
    );
}

#[test]
fn empty_frame_fails() {
    assert_eq!(decode_client_message(&[]), Err(DecodeError::Empty));
    assert_eq!(decode_server_message(&[]), Err(DecodeError::Empty));
}
