/// Attack patterns.
///
/// A pattern is started by a turret's debounced `Fire` task.  It either
/// pushes projectiles straight away or schedules a series of `Emit` tasks;
/// each `Emit` does its geometry when it fires, reading the turret and
/// target as they are at that moment.

use rand::Rng;
use tracing::{debug, trace};

use crate::config::Settings;
use crate::entities::{FrameEvent, Projectile, Surface, Target, TurretId, TurretKind};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::turret::Turret;

pub mod aimed;
pub mod radial;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    RadialBurst,
    Windmill,
    Flower,
    Spiral,
    Line,
    Cone,
    Shotgun,
    Overtake,
}

pub const RADIAL_PATTERNS: [Pattern; 4] = [
    Pattern::RadialBurst,
    Pattern::Windmill,
    Pattern::Flower,
    Pattern::Spiral,
];

pub const AIMED_PATTERNS: [Pattern; 3] = [Pattern::Line, Pattern::Cone, Pattern::Shotgun];

pub const AIMED_PATTERNS_HARD: [Pattern; 4] = [
    Pattern::Line,
    Pattern::Cone,
    Pattern::Shotgun,
    Pattern::Overtake,
];

impl TurretKind {
    /// The patterns a turret of this kind picks from, uniformly.
    pub fn pattern_table(self, settings: &Settings) -> &'static [Pattern] {
        match self {
            TurretKind::Radial => &RADIAL_PATTERNS,
            TurretKind::Aimed if settings.overtake_enabled => &AIMED_PATTERNS_HARD,
            TurretKind::Aimed => &AIMED_PATTERNS,
        }
    }
}

/// One delayed step of a pattern.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Emission {
    WindmillRing,
    FlowerRing,
    SpiralShot,
    AimedShot,
    ConeRow { len: usize },
    ShotgunWave,
    OvertakeWave { magnitude: f32, global_offset: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// A debounced fire request carrying the pattern chosen when it was made.
    Fire(Pattern),
    Emit(Emission),
}

/// What the game scheduler holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Task {
    pub turret: TurretId,
    /// The owning turret's epoch when this was scheduled.
    pub epoch: u32,
    pub action: Action,
}

/// Everything a pattern may touch besides its own turret.
pub struct FireContext<'a, R: Rng> {
    pub scheduler: &'a mut Scheduler<Task>,
    pub projectiles: &'a mut Vec<Projectile>,
    pub events: &'a mut Vec<FrameEvent>,
    pub target: &'a Target,
    pub surface: &'a Surface,
    pub settings: &'a Settings,
    pub rng: &'a mut R,
}

/// Run a task that just came due on the turret that owns it.
pub fn dispatch<R: Rng>(
    turret: &mut Turret,
    handle: TimerHandle,
    task: Task,
    ctx: &mut FireContext<'_, R>,
) {
    if task.epoch != turret.epoch() {
        trace!(turret = turret.id.0, "stale task from before teardown dropped");
        return;
    }
    match task.action {
        Action::Fire(pattern) => {
            turret.settle_fire(handle);
            ctx.events.push(FrameEvent::PatternStarted {
                turret: turret.id,
                pattern,
            });
            invoke(turret, pattern, ctx);
        }
        Action::Emit(emission) => emit(turret, emission, ctx),
    }
}

/// Start `pattern` from `turret` now.
pub fn invoke<R: Rng>(turret: &mut Turret, pattern: Pattern, ctx: &mut FireContext<'_, R>) {
    debug!(turret = turret.id.0, ?pattern, "pattern started");
    match pattern {
        Pattern::RadialBurst => radial::fire_burst(turret, ctx),
        Pattern::Windmill => radial::fire_windmill(turret, ctx),
        Pattern::Flower => radial::fire_flower(turret, ctx),
        Pattern::Spiral => radial::fire_spiral(turret, ctx),
        Pattern::Line => aimed::fire_line(turret, ctx),
        Pattern::Cone => aimed::fire_cone(turret, ctx),
        Pattern::Shotgun => aimed::fire_shotgun(turret, ctx),
        Pattern::Overtake => aimed::fire_overtake(turret, ctx),
    }
}

fn emit<R: Rng>(turret: &mut Turret, emission: Emission, ctx: &mut FireContext<'_, R>) {
    match emission {
        Emission::WindmillRing => radial::windmill_ring(turret, ctx),
        Emission::FlowerRing => radial::flower_ring(turret, ctx),
        Emission::SpiralShot => radial::spiral_shot(turret, ctx),
        Emission::AimedShot => aimed::aimed_shot(turret, ctx),
        Emission::ConeRow { len } => aimed::cone_row(turret, len, ctx),
        Emission::ShotgunWave => aimed::shotgun_wave(turret, ctx),
        Emission::OvertakeWave {
            magnitude,
            global_offset,
        } => aimed::overtake_wave(turret, magnitude, global_offset, ctx),
    }
}

/// Schedule `count` emissions `spacing_ms` apart, the first one immediately,
/// tracking each handle with `count` as the registry bound.
fn schedule_series<R: Rng>(
    turret: &mut Turret,
    ctx: &mut FireContext<'_, R>,
    count: usize,
    spacing_ms: u64,
    mut step: impl FnMut(usize) -> Emission,
) {
    for i in 0..count {
        let task = turret.task(Action::Emit(step(i)));
        let handle = ctx.scheduler.schedule(task, i as u64 * spacing_ms);
        turret.track(handle, count);
    }
}
