/// Turret base: falling motion, recycling, and the timer bookkeeping that
/// lets a turret's scheduled work be cancelled wholesale.

use std::collections::VecDeque;
use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use tracing::debug;

use crate::entities::{Surface, TurretId, TurretKind};
use crate::patterns::{Action, Pattern, Task};
use crate::scheduler::{Scheduler, TimerHandle};

/// Spacing between shots in an aimed row.  Fixed, never accumulated.
pub const AIMED_SPACING: f32 = PI / 16.0;

#[derive(Clone, Debug)]
pub struct Turret {
    pub id: TurretId,
    pub kind: TurretKind,
    pub pos: Vec2,
    /// Surface units per frame.
    pub vel_y: f32,
    /// Fall speed restored on every recycle.
    pub recycle_vel_y: f32,
    pub radius: f32,
    /// Radial turrets rotate this a little after every ring so successive
    /// rings spiral; aimed turrets keep it at `AIMED_SPACING`.
    pub angular_offset: f32,
    /// The debounced fire request, if one is waiting.
    pending_fire: Option<TimerHandle>,
    /// Handles of the in-progress pattern's sub-emissions, oldest first.
    registry: VecDeque<TimerHandle>,
    /// Bumped by every teardown.  Tasks stamped with an older epoch are
    /// dropped when they come due, including ones the registry already
    /// evicted and so could not cancel.
    epoch: u32,
}

impl Turret {
    /// New turret just above the top edge, fully inside the surface width.
    pub fn spawn(id: TurretId, kind: TurretKind, surface: &Surface, rng: &mut impl Rng) -> Self {
        let radius = surface.turret_radius();
        let x = radius + rng.gen::<f32>() * (surface.width - 2.0 * radius).max(0.0);
        let vel_y = match kind {
            // 0.025% – 0.05% of the surface height per frame
            TurretKind::Radial => surface.height * (rng.gen::<f32>() * 0.00025 + 0.00025),
            // twice the radial band
            TurretKind::Aimed => surface.height * (rng.gen::<f32>() * 0.0005 + 0.0005),
        };
        let angular_offset = match kind {
            TurretKind::Radial => 0.0,
            TurretKind::Aimed => AIMED_SPACING,
        };
        Self {
            id,
            kind,
            pos: Vec2::new(x, -radius),
            vel_y,
            recycle_vel_y: vel_y,
            radius,
            angular_offset,
            pending_fire: None,
            registry: VecDeque::new(),
            epoch: 0,
        }
    }

    /// Fall one frame; once fully below the surface, wrap back to the top at
    /// a fresh random column.
    pub fn update(&mut self, surface: &Surface, rng: &mut impl Rng) {
        self.pos.y += self.vel_y;

        if self.pos.y > surface.height + self.radius {
            self.pos.x = rng.gen::<f32>() * surface.width;
            self.pos.y = -self.radius;
            self.vel_y = self.recycle_vel_y;
        }
    }

    // ── Debounce ──────────────────────────────────────────────────────────────

    /// Pick a pattern from `table` and arm it `debounce_ms` from now,
    /// replacing any request still waiting.  Only the latest request in a
    /// burst ever runs.
    pub fn request_fire(
        &mut self,
        scheduler: &mut Scheduler<Task>,
        table: &[Pattern],
        debounce_ms: u64,
        rng: &mut impl Rng,
    ) -> Option<Pattern> {
        if table.is_empty() {
            return None;
        }
        let pattern = table[rng.gen_range(0..table.len())];
        let task = self.task(Action::Fire(pattern));
        if let Some(previous) = self.pending_fire.replace(scheduler.schedule(task, debounce_ms)) {
            scheduler.cancel(previous);
        }
        Some(pattern)
    }

    /// A task owned by this turret in its current epoch.
    pub fn task(&self, action: Action) -> Task {
        Task {
            turret: self.id,
            epoch: self.epoch,
            action,
        }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn pending_fire(&self) -> Option<TimerHandle> {
        self.pending_fire
    }

    /// Called when the debounced request fires.
    pub(crate) fn settle_fire(&mut self, handle: TimerHandle) {
        if self.pending_fire == Some(handle) {
            self.pending_fire = None;
        }
    }

    // ── Emission registry ─────────────────────────────────────────────────────

    /// Remember a scheduled sub-emission, forgetting (not cancelling) the
    /// oldest handles once more than `bound` are held.
    pub fn track(&mut self, handle: TimerHandle, bound: usize) {
        self.registry.push_back(handle);
        while self.registry.len() > bound {
            self.registry.pop_front();
        }
    }

    pub fn tracked(&self) -> &VecDeque<TimerHandle> {
        &self.registry
    }

    /// Cancel the pending fire request and every tracked emission.  Safe to
    /// call any number of times.  Returns how many tasks were still live.
    pub fn teardown(&mut self, scheduler: &mut Scheduler<Task>) -> usize {
        let mut cancelled = 0;
        if let Some(handle) = self.pending_fire.take() {
            cancelled += usize::from(scheduler.cancel(handle));
        }
        for handle in self.registry.drain(..) {
            cancelled += usize::from(scheduler.cancel(handle));
        }
        self.epoch = self.epoch.wrapping_add(1);
        debug!(turret = self.id.0, cancelled, "turret torn down");
        cancelled
    }
}
