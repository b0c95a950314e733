//! Client-side prediction and server reconciliation.
//!
//! Every local input is applied immediately and kept in a bounded log until the
//! server acknowledges it. Snapshots overwrite the predicted state with the
//! authoritative one, drop acknowledged inputs and replay the rest.

use crate::protocol::PlayerState;
use arena_core::{isqrt_u64, Fixed, InputSeq};
use arena_physics::{step, ArenaGeometry, InputSample, Presence, PredictedState};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Default bound on unacknowledged inputs (about seven seconds at 144 Hz).
pub const DEFAULT_MAX_PENDING_INPUTS: usize = 1024;

/// One transmitted, not yet acknowledged input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInput {
    /// Sequence number sent with the input.
    pub seq: InputSeq,
    /// The sampled controls.
    pub input: InputSample,
    /// Slow multiplier in effect when the input was applied.
    pub slow_mul: Fixed,
}

/// Send-ordered log of unacknowledged inputs with a hard capacity.
#[derive(Debug, Clone)]
pub struct InputLog {
    entries: VecDeque<PendingInput>,
    capacity: usize,
}

impl InputLog {
    /// Create an empty log holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_PENDING_INPUTS)),
            capacity,
        }
    }

    /// Append an entry; returns the oldest entry if it had to be evicted.
    pub fn push(&mut self, entry: PendingInput) -> Option<PendingInput> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    /// Drop every entry acknowledged by `ack`; returns how many were dropped.
    pub fn discard_acked(&mut self, ack: InputSeq) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.seq.is_acked_by(ack));
        before - self.entries.len()
    }

    /// Remove everything; returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingInput> {
        self.entries.iter()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Metrics for tracking prediction accuracy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionMetrics {
    /// Inputs applied locally.
    pub total_predictions: u64,
    /// Inputs re-applied during reconciliation.
    pub total_replays: u64,
    /// Snapshots without an acknowledgment that cleared the log.
    pub total_resyncs: u64,
    /// Inputs evicted because the log was full.
    pub evicted_inputs: u64,
    /// Distance between the predicted and corrected position at the last reconcile.
    pub last_correction: u64,
    /// Largest correction seen.
    pub max_correction: u64,
}

/// Result of reconciliation with server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationResult {
    /// No acknowledgment present: the server state was taken as-is and the log cleared.
    Resynced {
        /// Pending inputs thrown away.
        dropped: usize,
    },
    /// Acknowledged inputs were dropped and the remainder replayed.
    Replayed {
        /// Acknowledged sequence number.
        acked: InputSeq,
        /// Inputs removed as acknowledged.
        discarded: usize,
        /// Inputs re-applied on top of the server state.
        replayed: usize,
    },
}

/// Client-side predictor with replay.
#[derive(Debug, Clone)]
pub struct ClientPredictor {
    state: PredictedState,
    pending: InputLog,
    metrics: PredictionMetrics,
}

impl ClientPredictor {
    /// Create a predictor with the default log bound.
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_INPUTS)
    }

    /// Create a predictor keeping at most `max_pending` unacknowledged inputs.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            state: PredictedState::default(),
            pending: InputLog::with_capacity(max_pending),
            metrics: PredictionMetrics::default(),
        }
    }

    /// Record `input` under `seq` and apply it to the predicted state.
    ///
    /// Returns the entry stored in the pending log.
    pub fn predict(
        &mut self,
        seq: InputSeq,
        input: InputSample,
        arena: &ArenaGeometry,
        presence: Presence,
    ) -> PendingInput {
        let entry = PendingInput {
            seq,
            input,
            slow_mul: self.state.slow_mul,
        };
        if let Some(evicted) = self.pending.push(entry) {
            self.metrics.evicted_inputs += 1;
            warn!(
                seq = evicted.seq.0,
                capacity = self.pending.capacity(),
                "Pending input log full; evicting oldest input"
            );
        }
        self.state = step(&self.state, &input, arena, presence);
        self.metrics.total_predictions += 1;
        entry
    }

    /// Take the authoritative record as the new base state without touching the log.
    ///
    /// Used on the first sighting of the local player.
    pub fn seed_from(&mut self, me: &PlayerState) {
        self.state = authoritative_state(me);
    }

    /// Reconcile against the server's record of the local player.
    pub fn reconcile(&mut self, me: &PlayerState, arena: &ArenaGeometry) -> ReconciliationResult {
        let before = self.state;
        self.state = authoritative_state(me);

        let result = match me.authority.last_input_seq {
            None => {
                let dropped = self.pending.clear();
                self.metrics.total_resyncs += 1;
                if dropped > 0 {
                    debug!(dropped, "Snapshot carries no input ack; cleared pending inputs");
                }
                ReconciliationResult::Resynced { dropped }
            }
            Some(acked) => {
                let discarded = self.pending.discard_acked(acked);
                let presence = if me.alive {
                    Presence::Alive
                } else {
                    Presence::Dead
                };
                for entry in self.pending.iter() {
                    self.state.slow_mul = entry.slow_mul;
                    self.state = step(&self.state, &entry.input, arena, presence);
                }
                let replayed = self.pending.len();
                self.metrics.total_replays += replayed as u64;
                ReconciliationResult::Replayed {
                    acked,
                    discarded,
                    replayed,
                }
            }
        };

        let correction = distance(&before, &self.state);
        self.metrics.last_correction = correction;
        self.metrics.max_correction = self.metrics.max_correction.max(correction);
        result
    }

    /// Current predicted state.
    pub fn state(&self) -> &PredictedState {
        &self.state
    }

    /// Pending (unacknowledged) inputs.
    pub fn pending(&self) -> &InputLog {
        &self.pending
    }

    /// Get number of pending (unconfirmed) inputs.
    pub fn pending_input_count(&self) -> usize {
        self.pending.len()
    }

    /// Get current prediction metrics.
    pub fn metrics(&self) -> &PredictionMetrics {
        &self.metrics
    }

    /// Reset predictor state, keeping the log bound.
    pub fn reset(&mut self) {
        self.state = PredictedState::default();
        self.pending.clear();
        self.metrics = PredictionMetrics::default();
    }
}

impl Default for ClientPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Predicted state implied by a server player record.
fn authoritative_state(me: &PlayerState) -> PredictedState {
    let authority = &me.authority;
    let (x, y) = authority
        .position
        .unwrap_or((Fixed::from_world(me.x), Fixed::from_world(me.y)));
    let (slide_x, slide_y) = authority.slide.unwrap_or((Fixed::ZERO, Fixed::ZERO));
    PredictedState {
        x,
        y,
        slide_x,
        slide_y,
        slow_mul: authority.slow_mul.unwrap_or(Fixed::ONE),
        ack_seq: authority.last_input_seq.unwrap_or(InputSeq::ZERO),
    }
}

fn distance(a: &PredictedState, b: &PredictedState) -> u64 {
    let dx = (a.x.raw() as i64 - b.x.raw() as i64).unsigned_abs();
    let dy = (a.y.raw() as i64 - b.y.raw() as i64).unsigned_abs();
    isqrt_u64(dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy)))
}
