//! Client-side replica of the server's per-tick player movement.
//!
//! Everything here is integer arithmetic so the predicted position converges
//! with the server bit-for-bit.

use crate::ArenaGeometry;
use arena_core::{isqrt_u64, Fixed, InputSeq, FIXED_SCALE};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Cardinal distance travelled per tick at full speed.
pub const MOVE_PER_TICK: Fixed = Fixed(2431);

/// Per-axis distance for diagonal keyboard movement (≈ MOVE_PER_TICK / √2).
pub const DIAG_MOVE_PER_TICK: Fixed = Fixed(1718);

/// Mouse offset at which steering reaches full speed.
pub const MOUSE_FULL_STRENGTH: Fixed = Fixed(150_000);

/// One sampled control reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSample {
    /// Move toward -Y.
    pub up: bool,
    /// Move toward +Y.
    pub down: bool,
    /// Move toward -X.
    pub left: bool,
    /// Move toward +X.
    pub right: bool,
    /// Steer toward the mouse instead of using the direction keys.
    pub mouse_active: bool,
    /// Offset from the player to the steering target.
    pub mouse_dx: Fixed,
    /// Offset from the player to the steering target.
    pub mouse_dy: Fixed,
}

impl InputSample {
    /// Bit 0 = up, 1 = down, 2 = left, 3 = right.
    pub fn direction_bits(&self) -> u8 {
        (self.up as u8) | (self.down as u8) << 1 | (self.left as u8) << 2 | (self.right as u8) << 3
    }

    /// Rebuild the direction flags from their packed form; other fields keep their values.
    pub fn with_direction_bits(mut self, bits: u8) -> Self {
        self.up = bits & 0b0001 != 0;
        self.down = bits & 0b0010 != 0;
        self.left = bits & 0b0100 != 0;
        self.right = bits & 0b1000 != 0;
        self
    }
}

/// Where the local player stands in the most recent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Present and alive; inputs move the player.
    Alive,
    /// Present but dead.
    Dead,
    /// Not in the snapshot (or no snapshot yet).
    Absent,
}

/// The client's running belief about its own authoritative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedState {
    /// Position X.
    pub x: Fixed,
    /// Position Y.
    pub y: Fixed,
    /// Previous tick's total movement on X.
    pub slide_x: Fixed,
    /// Previous tick's total movement on Y.
    pub slide_y: Fixed,
    /// Speed multiplier, 1000 = 100%.
    pub slow_mul: Fixed,
    /// Last input sequence the server confirmed.
    pub ack_seq: InputSeq,
}

impl Default for PredictedState {
    fn default() -> Self {
        Self {
            x: Fixed::ZERO,
            y: Fixed::ZERO,
            slide_x: Fixed::ZERO,
            slide_y: Fixed::ZERO,
            slow_mul: Fixed::ONE,
            ack_seq: InputSeq::ZERO,
        }
    }
}

impl PredictedState {
    /// Position in world units for the renderer.
    pub fn world_position(&self) -> Vec2 {
        Vec2::new(self.x.to_world(), self.y.to_world())
    }
}

/// Advance `state` by one tick of `input`, clamped to `arena`.
pub fn step(
    state: &PredictedState,
    input: &InputSample,
    arena: &ArenaGeometry,
    presence: Presence,
) -> PredictedState {
    let mut next = *state;
    if presence != Presence::Alive {
        next.slide_x = Fixed::ZERO;
        next.slide_y = Fixed::ZERO;
        return next;
    }

    let base = Fixed(
        (MOVE_PER_TICK.raw() as i64 * state.slow_mul.raw() as i64 / FIXED_SCALE as i64) as i32,
    );

    let (dx, dy) = if input.mouse_active {
        mouse_delta(input.mouse_dx, input.mouse_dy, base)
    } else {
        keyboard_delta(input, base)
    };

    // a quarter of last tick's motion carries over
    let total_x = dx.wrapping_add(Fixed(state.slide_x.raw() / 4));
    let total_y = dy.wrapping_add(Fixed(state.slide_y.raw() / 4));

    let (x, y) = arena.clamp(state.x.wrapping_add(total_x), state.y.wrapping_add(total_y));
    next.x = x;
    next.y = y;
    next.slide_x = total_x;
    next.slide_y = total_y;
    next
}

fn mouse_delta(mdx: Fixed, mdy: Fixed, base: Fixed) -> (Fixed, Fixed) {
    let ax = mdx.unsigned_abs() as u64;
    let ay = mdy.unsigned_abs() as u64;
    let dist = isqrt_u64(ax * ax + ay * ay);
    if dist == 0 {
        return (Fixed::ZERO, Fixed::ZERO);
    }
    let full = MOUSE_FULL_STRENGTH.raw() as u64;
    let clamped = dist.min(full);
    let num = base.raw() as i128 * clamped as i128;
    let den = dist as i128 * full as i128;
    (
        Fixed((mdx.raw() as i128 * num / den) as i32),
        Fixed((mdy.raw() as i128 * num / den) as i32),
    )
}

fn keyboard_delta(input: &InputSample, base: Fixed) -> (Fixed, Fixed) {
    let sx = input.right as i32 - input.left as i32;
    let sy = input.down as i32 - input.up as i32;
    if sx != 0 && sy != 0 {
        (
            Fixed(sx * DIAG_MOVE_PER_TICK.raw()),
            Fixed(sy * DIAG_MOVE_PER_TICK.raw()),
        )
    } else {
        (
            Fixed(sx.wrapping_mul(base.raw())),
            Fixed(sy.wrapping_mul(base.raw())),
        )
    }
}
