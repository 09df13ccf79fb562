/// Session-level game logic.
///
/// Public functions take an immutable reference to the current `GameState`
/// (and, where needed, an RNG handle) and return a brand-new `GameState`.
/// All timers live inside the state's own scheduler, so a session is fully
/// described by its value and a seeded RNG replays it exactly.

use glam::Vec2;
use rand::Rng;
use tracing::{debug, info};

use crate::config::Settings;
use crate::entities::{
    FrameEvent, GameStatus, Projectile, Surface, Target, TurretId, TurretKind,
};
use crate::patterns::{dispatch, FireContext, Task};
use crate::scheduler::Scheduler;
use crate::turret::Turret;

/// The explicit per-session context: everything one game needs, created at
/// start and dropped at the end.
#[derive(Clone, Debug)]
pub struct GameState {
    pub settings: Settings,
    pub surface: Surface,
    pub target: Target,
    /// Radial turrets first, then aimed; `TurretId` indexes this list.
    pub turrets: Vec<Turret>,
    /// The shared sink every pattern appends to.
    pub projectiles: Vec<Projectile>,
    pub scheduler: Scheduler<Task>,
    pub status: GameStatus,
    /// Survival time so far.
    pub total_ms: u64,
    pub frame: u64,
    /// What happened during the most recent tick.
    pub events: Vec<FrameEvent>,
}

// ── Constructors ─────────────────────────────────────────────────────────────

/// Start a session: turrets spawned above the top edge, target centred.
pub fn init_state(settings: Settings, surface: Surface, rng: &mut impl Rng) -> GameState {
    let kinds = std::iter::repeat(TurretKind::Radial)
        .take(settings.radial_turret_number as usize)
        .chain(std::iter::repeat(TurretKind::Aimed).take(settings.aimed_turret_number as usize));
    let turrets: Vec<Turret> = kinds
        .enumerate()
        .map(|(i, kind)| Turret::spawn(TurretId(i), kind, &surface, rng))
        .collect();

    info!(
        radial = settings.radial_turret_number,
        aimed = settings.aimed_turret_number,
        width = surface.width,
        height = surface.height,
        "session started"
    );

    GameState {
        target: Target {
            pos: surface.centre(),
            radius: surface.target_radius(),
        },
        turrets,
        projectiles: Vec::new(),
        scheduler: Scheduler::new(),
        status: GameStatus::Playing,
        total_ms: 0,
        frame: 0,
        events: Vec::new(),
        settings,
        surface,
    }
}

// ── Input-driven state transitions (pure) ───────────────────────────────────

/// Put the target at `(x, y)`, clamped to the surface.
pub fn move_target(state: &GameState, x: f32, y: f32) -> GameState {
    let pos = Vec2::new(
        x.clamp(0.0, state.surface.width),
        y.clamp(0.0, state.surface.height),
    );
    GameState {
        target: Target {
            pos,
            ..state.target.clone()
        },
        ..state.clone()
    }
}

/// Shift the target by `(dx, dy)`, clamped to the surface.
pub fn nudge_target(state: &GameState, dx: f32, dy: f32) -> GameState {
    move_target(state, state.target.pos.x + dx, state.target.pos.y + dy)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Whether a frame at `total_ms` falls inside the firing window that opens
/// at every multiple of `interval_ms`.
pub fn fire_due(total_ms: u64, interval_ms: u64, window_ms: u64) -> bool {
    interval_ms > 0 && total_ms % interval_ms < window_ms
}

/// Whole seconds survived, rounded.
pub fn score_seconds(state: &GameState) -> u64 {
    (state.total_ms + 500) / 1000
}

/// Remove every projectile that has fully left the surface.  Returns how
/// many were removed.
pub fn prune_projectiles(projectiles: &mut Vec<Projectile>, surface: &Surface) -> usize {
    let before = projectiles.len();
    projectiles.retain(|p| surface.holds(p.pos, p.radius));
    before - projectiles.len()
}

/// Cancel every turret's outstanding work, then drop whatever is left in
/// the queue (emissions the registries already forgot).  Returns how many
/// live tasks were cancelled or dropped.
fn teardown_all(turrets: &mut [Turret], scheduler: &mut Scheduler<Task>) -> usize {
    let cancelled: usize = turrets.iter_mut().map(|t| t.teardown(scheduler)).sum();
    let forgotten = scheduler.pending();
    scheduler.clear();
    cancelled + forgotten
}

// ── Per-frame tick (nearly pure, RNG is injected) ──────────────────────────

/// Advance the session by one frame covering `elapsed_ms` of game time.
pub fn tick(state: &GameState, elapsed_ms: u64, rng: &mut impl Rng) -> GameState {
    let mut next = state.clone();
    next.events.clear();
    if next.status != GameStatus::Playing {
        return next;
    }

    next.frame += 1;
    next.total_ms += elapsed_ms;
    let now = next.total_ms;

    let GameState {
        settings,
        surface,
        target,
        turrets,
        projectiles,
        scheduler,
        status,
        events,
        ..
    } = &mut next;

    // ── 1. Timers that came due since the last frame ─────────────────────────
    while let Some((handle, task)) = scheduler.pop_until(now) {
        let Some(turret) = turrets.get_mut(task.turret.0) else {
            continue;
        };
        let mut ctx = FireContext {
            scheduler: &mut *scheduler,
            projectiles: &mut *projectiles,
            events: &mut *events,
            target: &*target,
            surface: &*surface,
            settings: &*settings,
            rng: &mut *rng,
        };
        dispatch(turret, handle, task, &mut ctx);
    }

    // ── 2. Turrets fall / recycle ────────────────────────────────────────────
    for turret in turrets.iter_mut() {
        turret.update(surface, rng);
    }

    // ── 3. Fire cadence ──────────────────────────────────────────────────────
    let radial_due = fire_due(now, settings.radial_fire_interval_ms, settings.fire_window_ms);
    let aimed_due = fire_due(now, settings.aimed_fire_interval_ms, settings.fire_window_ms);
    for turret in turrets.iter_mut() {
        let due = match turret.kind {
            TurretKind::Radial => radial_due,
            TurretKind::Aimed => aimed_due,
        };
        if due {
            let table = turret.kind.pattern_table(settings);
            turret.request_fire(scheduler, table, settings.fire_debounce_ms, rng);
        }
    }

    // ── 4. Projectiles move; any touching the target ends the game ───────────
    let mut hit = false;
    for projectile in projectiles.iter_mut() {
        projectile.advance();
        hit |= target.collides_with(projectile);
    }

    if hit {
        let cancelled = teardown_all(turrets, scheduler);
        *status = GameStatus::GameOver;
        events.push(FrameEvent::TargetHit);
        info!(survived_ms = now, cancelled, "target hit");
        return next;
    }

    // ── 5. Prune ─────────────────────────────────────────────────────────────
    let pruned = prune_projectiles(projectiles, surface);
    if pruned > 0 {
        events.push(FrameEvent::ProjectilesPruned { count: pruned });
    }

    next
}

/// Finish the session: cancel every turret's timers and drop all
/// projectiles, so nothing scheduled in this game can reach the next one.
pub fn end_session(state: &GameState) -> GameState {
    let mut next = state.clone();
    let cancelled = teardown_all(&mut next.turrets, &mut next.scheduler);
    next.projectiles.clear();
    next.events.clear();
    next.status = GameStatus::GameOver;
    debug!(cancelled, "session ended");
    next
}
