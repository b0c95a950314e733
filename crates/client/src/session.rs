//! Session state machine gluing the codec, prediction and map collaborators.
//!
//! A [`Session`] performs no I/O. Every entry point returns the messages to
//! transmit and/or the [`SessionEvent`]s for the presentation layer; the async
//! driver owns the socket.

use arena_assets::{wave_map, MapDocument, MapStore, LOBBY_MAP_ID};
use arena_core::{InputSeq, PlayerId, Room, MAX_NAME_CHARS, PLAYER_RADIUS};
use arena_net::{
    decode_server_message, ClientMessage, ClientPredictor, DecodeError, InputMessage,
    LeaderboardEntry, PartyUpdate, PendingInput, ReconciliationResult, ServerMessage, Snapshot,
    WaveDef,
};
use arena_physics::{ArenaGeometry, InputSample, Presence, PredictedState};
use glam::Vec2;
use tracing::{debug, info, warn};

/// Transport-level lifecycle of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No open transport.
    Disconnected,
    /// Transport open, no Welcome yet.
    Connected,
    /// Welcome received.
    Identified {
        /// Id the server assigned to us.
        player_id: PlayerId,
    },
}

impl ConnectionState {
    /// Whether the transport is open.
    pub fn is_open(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

/// Party invite waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvite {
    /// Inviting player.
    pub from_id: PlayerId,
    /// Inviting player's name.
    pub from_name: String,
}

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Transport closed; identity and snapshot were cleared.
    Disconnected,
    /// Welcome received.
    Identified {
        /// Our player id.
        player_id: PlayerId,
    },
    /// A local input was applied.
    Predicted(PredictedState),
    /// The predicted state was seeded from the first server sighting.
    Seeded(PredictedState),
    /// The predicted state was corrected from a snapshot.
    Reconciled(ReconciliationResult),
    /// A snapshot became the latest world state.
    SnapshotApplied {
        /// Server tick of the snapshot.
        tick: u32,
        /// Room it describes.
        room: Room,
    },
    /// The current room changed.
    RoomChanged {
        /// Previous room.
        from: Room,
        /// New room.
        to: Room,
    },
    /// The active map changed.
    MapChanged {
        /// New map id.
        id: String,
    },
    /// A wave definition arrived.
    WaveDefined(WaveDef),
    /// Someone invited us to a party.
    InviteReceived(PendingInvite),
    /// Party membership changed.
    PartyChanged(PartyUpdate),
    /// New standings arrived.
    LeaderboardUpdated,
    /// An inbound frame failed to decode and was dropped.
    Malformed(DecodeError),
    /// A message with an unknown tag was ignored.
    Ignored {
        /// The unknown tag.
        tag: u8,
    },
}

/// Result of one local tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Messages to transmit, in order.
    pub messages: Vec<ClientMessage>,
    /// The input recorded for reconciliation, if one was sent.
    pub applied: Option<PendingInput>,
}

/// Explicit client session context.
pub struct Session {
    connection: ConnectionState,
    has_played: bool,
    name: String,
    room: Room,
    last_snapshot: Option<Snapshot>,
    wave_def: Option<WaveDef>,
    current_wave: u16,
    map: Option<MapDocument>,
    arena: ArenaGeometry,
    maps: MapStore,
    predictor: ClientPredictor,
    next_seq: InputSeq,
    party: PartyUpdate,
    invite: Option<PendingInvite>,
    leaderboard: Vec<LeaderboardEntry>,
}

impl Session {
    /// New disconnected session resolving lobby maps through `maps`.
    pub fn new(maps: MapStore, max_pending_inputs: usize) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            has_played: false,
            name: String::new(),
            room: Room::Lobby,
            last_snapshot: None,
            wave_def: None,
            current_wave: 1,
            map: None,
            arena: ArenaGeometry::Unbounded,
            maps,
            predictor: ClientPredictor::with_max_pending(max_pending_inputs),
            next_seq: InputSeq::FIRST,
            party: PartyUpdate::default(),
            invite: None,
            leaderboard: Vec::new(),
        }
    }

    /// Transport opened. A session that already played re-announces its name.
    pub fn on_open(&mut self) -> Vec<ClientMessage> {
        self.connection = ConnectionState::Connected;
        if self.has_played && !self.name.is_empty() {
            vec![ClientMessage::SetName {
                name: self.name.clone(),
            }]
        } else {
            Vec::new()
        }
    }

    /// Transport closed. Prediction state and pending inputs are kept.
    pub fn on_close(&mut self) -> Vec<SessionEvent> {
        self.connection = ConnectionState::Disconnected;
        self.last_snapshot = None;
        info!(
            pending = self.predictor.pending_input_count(),
            "Session disconnected"
        );
        vec![SessionEvent::Disconnected]
    }

    /// Commit a display name and start playing.
    ///
    /// The name is trimmed and clipped to 18 characters.
    pub fn commit_name(&mut self, raw: &str) -> Vec<ClientMessage> {
        self.name = raw.trim().chars().take(MAX_NAME_CHARS).collect();
        self.has_played = true;
        if self.connection.is_open() {
            vec![ClientMessage::SetName {
                name: self.name.clone(),
            }]
        } else {
            Vec::new()
        }
    }

    /// One local tick: predict, record and emit the input, then check portals.
    pub fn tick(&mut self, input: InputSample) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !self.connection.is_open() || !self.has_played {
            return outcome;
        }

        let seq = self.next_seq;
        self.next_seq = seq.next();
        let presence = self.presence();
        let applied = self.predictor.predict(seq, input, &self.arena, presence);

        let (mouse_dx, mouse_dy) = InputMessage::mouse_from_fixed(input.mouse_dx, input.mouse_dy);
        outcome.messages.push(ClientMessage::Input(InputMessage {
            seq,
            direction_bits: input.direction_bits(),
            mouse_active: input.mouse_active,
            mouse_dx,
            mouse_dy,
        }));
        outcome.applied = Some(applied);

        if let Some(portal_id) = self.touching_portal() {
            debug!(portal_id, "Entering portal");
            outcome
                .messages
                .push(ClientMessage::EnterPortal { portal_id });
        }
        outcome
    }

    /// Decode and handle one inbound frame.
    pub fn handle_bytes(&mut self, data: &[u8]) -> Vec<SessionEvent> {
        self.handle_decoded(decode_server_message(data))
    }

    /// Handle a decode result; malformed frames are logged and dropped.
    pub fn handle_decoded(
        &mut self,
        decoded: Result<ServerMessage, DecodeError>,
    ) -> Vec<SessionEvent> {
        match decoded {
            Ok(msg) => self.handle_message(msg),
            Err(err) => {
                warn!(error = %err, "Dropping malformed server message");
                vec![SessionEvent::Malformed(err)]
            }
        }
    }

    /// Apply one server message.
    pub fn handle_message(&mut self, msg: ServerMessage) -> Vec<SessionEvent> {
        match msg {
            ServerMessage::Welcome { your_id } => {
                info!(player_id = your_id, "Identified by server");
                self.connection = ConnectionState::Identified { player_id: your_id };
                vec![SessionEvent::Identified { player_id: your_id }]
            }
            ServerMessage::WaveDef(def) => {
                debug!(wave = def.wave_number, half_size = def.half_size, "Wave definition");
                self.wave_def = Some(def);
                let mut events = vec![SessionEvent::WaveDefined(def)];
                self.set_map(wave_map(&def), &mut events);
                events
            }
            ServerMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            ServerMessage::PartyInvite { from_id, from_name } => {
                if self.room != Room::Lobby {
                    debug!(from_id, "Ignoring party invite outside the lobby");
                    return Vec::new();
                }
                let invite = PendingInvite { from_id, from_name };
                self.invite = Some(invite.clone());
                vec![SessionEvent::InviteReceived(invite)]
            }
            ServerMessage::PartyUpdate(update) => {
                self.party = update.clone();
                vec![SessionEvent::PartyChanged(update)]
            }
            ServerMessage::Leaderboard(entries) => {
                self.leaderboard = entries;
                vec![SessionEvent::LeaderboardUpdated]
            }
            ServerMessage::Unknown { tag } => {
                debug!(tag, "Ignoring unknown server message");
                vec![SessionEvent::Ignored { tag }]
            }
        }
    }

    /// Invite another player into our party.
    pub fn invite_to_party(&self, target_id: PlayerId) -> Option<ClientMessage> {
        self.connection
            .is_open()
            .then_some(ClientMessage::PartyInvite { target_id })
    }

    /// Answer the pending invite. Accepting is only possible from the lobby.
    pub fn respond_to_invite(&mut self, accept: bool) -> Option<ClientMessage> {
        if !self.connection.is_open() || (accept && self.room != Room::Lobby) {
            return None;
        }
        let invite = self.invite.take()?;
        Some(ClientMessage::PartyInviteResponse {
            from_id: invite.from_id,
            accept,
        })
    }

    /// Leave the current party.
    pub fn leave_party(&self) -> Option<ClientMessage> {
        self.connection.is_open().then_some(ClientMessage::PartyLeave)
    }

    /// Where the local player should be drawn, in world units.
    pub fn local_player_position(&self) -> Vec2 {
        let Some(player_id) = self.player_id() else {
            return Vec2::ZERO;
        };
        if self.has_played {
            return self.predictor.state().world_position();
        }
        self.last_snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.player(player_id))
            .map(|me| Vec2::new(me.x, me.y))
            .unwrap_or(Vec2::ZERO)
    }

    /// Connection lifecycle state.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Our player id, once identified.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self.connection {
            ConnectionState::Identified { player_id } => Some(player_id),
            _ => None,
        }
    }

    /// Whether a name has been committed.
    pub fn has_played(&self) -> bool {
        self.has_played
    }

    /// Committed display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Room of the latest snapshot.
    pub fn room(&self) -> Room {
        self.room
    }

    /// Latest snapshot, cleared on disconnect.
    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Latest wave definition.
    pub fn wave_def(&self) -> Option<&WaveDef> {
        self.wave_def.as_ref()
    }

    /// Current wave number (1 outside the combat room).
    pub fn current_wave(&self) -> u16 {
        self.current_wave
    }

    /// Active map document.
    pub fn map(&self) -> Option<&MapDocument> {
        self.map.as_ref()
    }

    /// Geometry prediction clamps against.
    pub fn arena(&self) -> &ArenaGeometry {
        &self.arena
    }

    /// Current predicted state.
    pub fn predicted(&self) -> &PredictedState {
        self.predictor.state()
    }

    /// The predictor (metrics, pending inputs).
    pub fn predictor(&self) -> &ClientPredictor {
        &self.predictor
    }

    /// Party membership.
    pub fn party(&self) -> &PartyUpdate {
        &self.party
    }

    /// Invite waiting for an answer.
    pub fn pending_invite(&self) -> Option<&PendingInvite> {
        self.invite.as_ref()
    }

    /// Latest standings.
    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if snapshot.room != self.room {
            events.push(SessionEvent::RoomChanged {
                from: self.room,
                to: snapshot.room,
            });
            self.room = snapshot.room;
            self.refresh_arena();
        }

        let me = self
            .player_id()
            .filter(|_| self.has_played)
            .and_then(|id| snapshot.player(id));
        if let Some(me) = me {
            if self.predictor.state().ack_seq == InputSeq::ZERO {
                self.predictor.seed_from(me);
                events.push(SessionEvent::Seeded(*self.predictor.state()));
            }
            let result = self.predictor.reconcile(me, &self.arena);
            events.push(SessionEvent::Reconciled(result));
        }

        self.current_wave = match (&snapshot.wave, self.room) {
            (Some(wave), Room::Wave) if wave.wave_number >= 1 => wave.wave_number,
            _ => 1,
        };
        self.resolve_map(&mut events);

        events.push(SessionEvent::SnapshotApplied {
            tick: snapshot.tick,
            room: snapshot.room,
        });
        self.last_snapshot = Some(snapshot);
        events
    }

    fn resolve_map(&mut self, events: &mut Vec<SessionEvent>) {
        let desired = match self.room {
            Room::Wave => format!("wave{}", self.current_wave),
            _ => LOBBY_MAP_ID.to_string(),
        };
        if self.map.as_ref().is_some_and(|map| map.id == desired) {
            return;
        }
        if self.room == Room::Wave {
            if let Some(def) = self.wave_def {
                self.set_map(wave_map(&def), events);
            }
            return;
        }
        match self.maps.load(LOBBY_MAP_ID).map(MapDocument::clone) {
            Ok(map) => self.set_map(map, events),
            Err(err) => warn!(error = %err, "Failed to load lobby map"),
        }
    }

    fn set_map(&mut self, map: MapDocument, events: &mut Vec<SessionEvent>) {
        events.push(SessionEvent::MapChanged { id: map.id.clone() });
        self.map = Some(map);
        self.refresh_arena();
    }

    fn refresh_arena(&mut self) {
        self.arena = self
            .map
            .as_ref()
            .map(|map| map.arena_geometry(self.room))
            .unwrap_or_default();
    }

    fn presence(&self) -> Presence {
        let me = self
            .player_id()
            .zip(self.last_snapshot.as_ref())
            .and_then(|(id, snapshot)| snapshot.player(id));
        match me {
            Some(me) if me.alive => Presence::Alive,
            Some(_) => Presence::Dead,
            None => Presence::Absent,
        }
    }

    fn touching_portal(&self) -> Option<u8> {
        if self.room != Room::Lobby {
            return None;
        }
        let player_id = self.player_id()?;
        let me = self.last_snapshot.as_ref()?.player(player_id)?;
        self.map
            .as_ref()?
            .portal_at(me.x, me.y, PLAYER_RADIUS)
            .map(|portal| portal.id)
    }
}
