/// Omnidirectional patterns: burst, windmill, flower and spiral.

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use tracing::trace;

use super::{schedule_series, Emission, FireContext};
use crate::entities::{PatternTag, Projectile};
use crate::geometry::{heading, in_gap, ring_slot};
use crate::turret::Turret;

pub const WINDMILL_SPACING_MS: u64 = 120;
pub const FLOWER_SPACING_MS: u64 = 20;
pub const SPIRAL_SPACING_MS: u64 = 10;

/// Rotation added after each windmill or flower ring.
pub const RING_TWIST: f32 = PI * 0.22;
/// Rotation added after each spiral shot.
pub const SPIRAL_TWIST: f32 = PI * 0.33;

const RADIAL_SPEED: f32 = 1.0;

// ── Counts ────────────────────────────────────────────────────────────────────

/// 0.5, 1 or 1.5 × base, rounded up.
pub fn windmill_ring_count(base: u32, rng: &mut impl Rng) -> usize {
    let multiplier = 0.5 + 0.5 * rng.gen_range(0..3) as f32;
    (base as f32 * multiplier).ceil() as usize
}

/// 1, 2 or 3 × 2.5 × base, rounded up.
pub fn flower_ring_count(base: u32, rng: &mut impl Rng) -> usize {
    let multiplier = 2.5 * (1 + rng.gen_range(0..3)) as f32;
    (base as f32 * multiplier).ceil() as usize
}

/// 1, 2 or 3 × 5 × base.
pub fn spiral_shot_count(base: u32, rng: &mut impl Rng) -> usize {
    base as usize * 5 * (1 + rng.gen_range(0..3))
}

/// Slot angles of a `count`-shot ring with the ±5% band around `gap` left
/// empty.
pub fn burst_angles(count: usize, gap: f32) -> Vec<f32> {
    (0..count)
        .map(|i| ring_slot(i, count))
        .filter(|&angle| !in_gap(angle, gap))
        .collect()
}

fn push_radial<R: Rng>(ctx: &mut FireContext<'_, R>, origin: Vec2, direction: Vec2) {
    ctx.projectiles.push(Projectile::spawn(
        ctx.surface,
        origin,
        direction,
        RADIAL_SPEED,
        PatternTag::Radial,
    ));
}

// ── Burst ─────────────────────────────────────────────────────────────────────

/// One full ring of 5 × base shots, emitted at once, with a single gap at a
/// random angle in [π, 2π).
pub fn fire_burst<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let count = ctx.settings.num_radial_projectiles as usize * 5;
    let gap = ctx.rng.gen_range(PI..2.0 * PI);
    for angle in burst_angles(count, gap) {
        // y is flipped so the gap opens toward the bottom of the surface
        let direction = Vec2::new(angle.cos(), (-angle).sin());
        push_radial(ctx, turret.pos, direction);
    }
}

// ── Windmill ──────────────────────────────────────────────────────────────────

pub fn fire_windmill<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let rings = windmill_ring_count(ctx.settings.num_radial_projectiles, &mut *ctx.rng);
    schedule_windmill(turret, ctx, rings);
}

pub fn schedule_windmill<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>, rings: usize) {
    schedule_series(turret, ctx, rings, WINDMILL_SPACING_MS, |_| Emission::WindmillRing);
}

/// A fixed reference ring plus a second ring rotated by the turret's offset.
pub fn windmill_ring<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let count = ctx.settings.num_radial_projectiles as usize;
    for j in 0..count {
        push_radial(ctx, turret.pos, heading(ring_slot(j, count)));
    }
    for j in 0..count {
        push_radial(ctx, turret.pos, heading(turret.angular_offset + ring_slot(j, count)));
    }
    trace!(turret = turret.id.0, offset = turret.angular_offset, "windmill ring");
    turret.angular_offset += RING_TWIST;
}

// ── Flower ────────────────────────────────────────────────────────────────────

pub fn fire_flower<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let rings = flower_ring_count(ctx.settings.num_radial_projectiles, &mut *ctx.rng);
    schedule_flower(turret, ctx, rings);
}

pub fn schedule_flower<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>, rings: usize) {
    schedule_series(turret, ctx, rings, FLOWER_SPACING_MS, |_| Emission::FlowerRing);
}

/// Two mirror-image shots at ±offset.
pub fn flower_ring<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let angle = turret.angular_offset;
    push_radial(ctx, turret.pos, heading(angle));
    push_radial(ctx, turret.pos, heading(-angle));
    trace!(turret = turret.id.0, offset = angle, "flower ring");
    turret.angular_offset += RING_TWIST;
}

// ── Spiral ────────────────────────────────────────────────────────────────────

pub fn fire_spiral<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let shots = spiral_shot_count(ctx.settings.num_radial_projectiles, &mut *ctx.rng);
    schedule_spiral(turret, ctx, shots);
}

pub fn schedule_spiral<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>, shots: usize) {
    schedule_series(turret, ctx, shots, SPIRAL_SPACING_MS, |_| Emission::SpiralShot);
}

pub fn spiral_shot<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    push_radial(ctx, turret.pos, heading(turret.angular_offset));
    turret.angular_offset += SPIRAL_TWIST;
}
