//! Math utilities
//!
//! Re-exports glam plus the integer snapping used by collision scans.

pub use glam::*;

/// Snap a coordinate to the cell it is heading into: `ceil` when moving in
/// the positive direction, `floor` otherwise (including at rest).
#[inline]
pub fn snap_ahead(position: f32, velocity: f32) -> i32 {
    if velocity > 0.0 {
        position.ceil() as i32
    } else {
        position.floor() as i32
    }
}

/// Integer cell of a position vector, snapped along its velocity.
#[inline]
pub fn snap_ahead_vec(position: Vec2, velocity: Vec2) -> IVec2 {
    IVec2::new(
        snap_ahead(position.x, velocity.x),
        snap_ahead(position.y, velocity.y),
    )
}
