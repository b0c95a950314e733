#![warn(missing_docs)]
//! Deterministic movement model and arena clamping for client-side prediction.

mod geometry;
mod movement;

pub use geometry::{ArenaGeometry, Obstacle};
pub use movement::{
    step, InputSample, Presence, PredictedState, DIAG_MOVE_PER_TICK, MOUSE_FULL_STRENGTH,
    MOVE_PER_TICK,
};

/// Axis-aligned rectangle in world units (portals, trigger zones).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Minimum corner x.
    pub x: f32,
    /// Minimum corner y.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Rect {
    /// Create a rectangle from its minimum corner and size.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Tests intersection with a circle (touching counts).
    pub fn overlaps_circle(&self, cx: f32, cy: f32, r: f32) -> bool {
        let closest_x = cx.clamp(self.x, self.x + self.w.max(0.0));
        let closest_y = cy.clamp(self.y, self.y + self.h.max(0.0));
        let dx = cx - closest_x;
        let dy = cy - closest_y;
        dx * dx + dy * dy <= r * r
    }
}
