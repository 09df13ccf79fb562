/// Angle and aiming math shared by every pattern.

use std::f32::consts::TAU;

use glam::Vec2;

/// Below this turret→target distance the aim direction is undefined and the
/// emission is skipped.
pub const MIN_AIM_DISTANCE: f32 = 1e-3;

/// Unit vector pointing along `angle` (radians, y grows downward).
pub fn heading(angle: f32) -> Vec2 {
    Vec2::from_angle(angle)
}

/// Angle of slot `index` when `count` slots are spread evenly round a circle.
pub fn ring_slot(index: usize, count: usize) -> f32 {
    TAU / count as f32 * index as f32
}

/// Live aim angle from `from` toward `to`, or `None` when the two coincide.
pub fn aim_angle(from: Vec2, to: Vec2) -> Option<f32> {
    let delta = to - from;
    if delta.length() < MIN_AIM_DISTANCE {
        return None;
    }
    Some(delta.y.atan2(delta.x))
}

/// Unit vector from `from` toward `to`, or `None` when the two coincide.
pub fn aim_direction(from: Vec2, to: Vec2) -> Option<Vec2> {
    let delta = to - from;
    if delta.length() < MIN_AIM_DISTANCE {
        return None;
    }
    Some(delta / delta.length())
}

/// First angle of a row of `len` shots `spacing` apart, placed so the row is
/// centred on `aim`.  Even rows straddle the aim line by half a slot.
pub fn centred_row_start(aim: f32, spacing: f32, len: usize) -> f32 {
    let slots = if len % 2 == 0 {
        len as f32 * 0.5 - 0.5
    } else {
        (len / 2) as f32
    };
    aim - spacing * slots
}

/// Whether `angle` falls strictly inside the ±5% band around `gap`.
pub fn in_gap(angle: f32, gap: f32) -> bool {
    angle > gap * 0.95 && angle < gap * 1.05
}
