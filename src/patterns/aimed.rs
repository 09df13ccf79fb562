/// Patterns that chase the target: line, cone, shotgun and overtake.
///
/// Every emission here recomputes the aim from the turret's and target's
/// current positions when it fires.  If the two coincide the emission is
/// skipped rather than fired along an undefined direction.

use std::f32::consts::PI;

use rand::Rng;
use tracing::{trace, warn};

use super::{schedule_series, Emission, FireContext};
use crate::entities::{FrameEvent, PatternTag, Projectile};
use crate::geometry::{aim_angle, aim_direction, centred_row_start, heading};
use crate::turret::Turret;

pub const LINE_SPACING_MS: u64 = 200;
pub const CONE_SPACING_MS: u64 = 200;
pub const SHOTGUN_SPACING_MS: u64 = 100;
pub const OVERTAKE_SPACING_MS: u64 = 100;

pub const SHOTGUN_WAVES: usize = 5;
pub const SHOTGUN_WAVE_SIZE: usize = 5;
/// Each shotgun pellet deviates from the aim line by at most this much.
pub const SHOTGUN_SPREAD: f32 = PI / 32.0;

pub const OVERTAKE_WAVES: usize = 20;
pub const OVERTAKE_WAVE_SIZE: usize = 5;
/// Angle between neighbouring shots inside one overtake wave.
pub const OVERTAKE_INNER_STEP: f32 = 0.1 * PI;

const LINE_SPEED: f32 = 2.0;
const CONE_SPEED: f32 = 1.5;
const SHOTGUN_SPEED: f32 = 1.5;

/// Angles of a `len`-shot row `spacing` apart, centred on `aim`.
pub fn cone_row_angles(aim: f32, spacing: f32, len: usize) -> Vec<f32> {
    let start = centred_row_start(aim, spacing, len);
    (0..len).map(|i| start + spacing * i as f32).collect()
}

/// Speed multiplier and extra rotation of overtake wave `index`.  Later
/// waves are faster and start further round, so they overtake the earlier
/// ones and unfurl toward the target.
pub fn overtake_wave_params(index: usize) -> (f32, f32) {
    let step = (index + 1) as f32;
    (0.3 + step * 0.3, step * 0.02 * PI)
}

fn push_aimed<R: Rng>(ctx: &mut FireContext<'_, R>, turret: &Turret, angle: f32, speed: f32) {
    ctx.projectiles.push(Projectile::spawn(
        ctx.surface,
        turret.pos,
        heading(angle),
        speed,
        PatternTag::Aimed,
    ));
}

fn note_skipped<R: Rng>(turret: &Turret, ctx: &mut FireContext<'_, R>) {
    warn!(turret = turret.id.0, "turret on top of target, emission skipped");
    ctx.events.push(FrameEvent::EmissionSkipped { turret: turret.id });
}

fn live_aim<R: Rng>(turret: &Turret, ctx: &mut FireContext<'_, R>) -> Option<f32> {
    let aim = aim_angle(turret.pos, ctx.target.pos);
    if aim.is_none() {
        note_skipped(turret, ctx);
    }
    aim
}

// ── Line ──────────────────────────────────────────────────────────────────────

/// 2 × base single shots, 200ms apart.
pub fn fire_line<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let shots = ctx.settings.num_aimed_projectiles as usize * 2;
    schedule_series(turret, ctx, shots, LINE_SPACING_MS, |_| Emission::AimedShot);
}

pub fn aimed_shot<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let Some(direction) = aim_direction(turret.pos, ctx.target.pos) else {
        note_skipped(turret, ctx);
        return;
    };
    ctx.projectiles.push(Projectile::spawn(
        ctx.surface,
        turret.pos,
        direction,
        LINE_SPEED,
        PatternTag::Aimed,
    ));
}

// ── Cone ──────────────────────────────────────────────────────────────────────

/// `base` rows, 200ms apart, shrinking by one shot per row.
pub fn fire_cone<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let rows = ctx.settings.num_aimed_projectiles as usize;
    schedule_series(turret, ctx, rows, CONE_SPACING_MS, |i| Emission::ConeRow { len: rows - i });
}

pub fn cone_row<R: Rng>(turret: &mut Turret, len: usize, ctx: &mut FireContext<'_, R>) {
    let Some(aim) = live_aim(turret, ctx) else {
        return;
    };
    for angle in cone_row_angles(aim, turret.angular_offset, len) {
        push_aimed(ctx, turret, angle, CONE_SPEED);
    }
    trace!(turret = turret.id.0, len, "cone row");
}

// ── Shotgun ───────────────────────────────────────────────────────────────────

pub fn fire_shotgun<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    schedule_series(turret, ctx, SHOTGUN_WAVES, SHOTGUN_SPACING_MS, |_| Emission::ShotgunWave);
}

pub fn shotgun_wave<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    let Some(aim) = live_aim(turret, ctx) else {
        return;
    };
    for _ in 0..SHOTGUN_WAVE_SIZE {
        let jitter = ctx.rng.gen_range(-SHOTGUN_SPREAD..=SHOTGUN_SPREAD);
        push_aimed(ctx, turret, aim + jitter, SHOTGUN_SPEED);
    }
}

// ── Overtake ──────────────────────────────────────────────────────────────────

pub fn fire_overtake<R: Rng>(turret: &mut Turret, ctx: &mut FireContext<'_, R>) {
    schedule_series(turret, ctx, OVERTAKE_WAVES, OVERTAKE_SPACING_MS, |i| {
        let (magnitude, global_offset) = overtake_wave_params(i);
        Emission::OvertakeWave {
            magnitude,
            global_offset,
        }
    });
}

pub fn overtake_wave<R: Rng>(
    turret: &mut Turret,
    magnitude: f32,
    global_offset: f32,
    ctx: &mut FireContext<'_, R>,
) {
    let Some(aim) = live_aim(turret, ctx) else {
        return;
    };
    let start = aim - OVERTAKE_INNER_STEP * 2.5;
    for i in 0..OVERTAKE_WAVE_SIZE {
        let angle = start + OVERTAKE_INNER_STEP * i as f32 + global_offset;
        push_aimed(ctx, turret, angle, magnitude);
    }
}
