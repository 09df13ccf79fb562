/// All game entity types: plain data plus the few scale rules every
/// system agrees on.  Turrets live in `turret.rs` because they own timer
/// handles.

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurretKind {
    /// Omnidirectional rings and spirals.
    Radial,
    /// Patterns that track the target.
    Aimed,
}

/// Which family of pattern spawned a projectile.  Only the renderer cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternTag {
    Radial,
    Aimed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameStatus {
    Playing,
    GameOver,
}

/// Index of a turret inside `GameState::turrets`.  Turrets are never
/// removed mid-session, so the index is stable for the session's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TurretId(pub usize);

// ── Surface ───────────────────────────────────────────────────────────────────

/// The rendering surface, seen only through its dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Distance a magnitude-1 projectile travels per frame.
    pub fn speed_unit(&self) -> f32 {
        (self.width + self.height) * 0.001
    }

    pub fn projectile_radius(&self) -> f32 {
        self.height * 0.003
    }

    pub fn turret_radius(&self) -> f32 {
        self.height * 0.01
    }

    pub fn target_radius(&self) -> f32 {
        self.height * 0.01
    }

    pub fn centre(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// True while a circle of `radius` at `pos` has not fully left the surface.
    pub fn holds(&self, pos: Vec2, radius: f32) -> bool {
        pos.x >= -radius
            && pos.x <= self.width + radius
            && pos.y >= -radius
            && pos.y <= self.height + radius
    }
}

// ── Projectiles ───────────────────────────────────────────────────────────────

/// A passive bullet.  Velocity is fixed at spawn; projectiles never re-aim.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    /// Surface units per frame.
    pub vel: Vec2,
    pub radius: f32,
    pub tag: PatternTag,
}

impl Projectile {
    /// Spawn at `origin` heading along the unit vector `direction`.
    /// `magnitude` is a multiple of the surface's speed unit.
    pub fn spawn(
        surface: &Surface,
        origin: Vec2,
        direction: Vec2,
        magnitude: f32,
        tag: PatternTag,
    ) -> Self {
        Self {
            pos: origin,
            vel: direction * magnitude * surface.speed_unit(),
            radius: surface.projectile_radius(),
            tag,
        }
    }

    pub fn advance(&mut self) {
        self.pos += self.vel;
    }
}

// ── Target ────────────────────────────────────────────────────────────────────

/// The player-controlled cursor.  Moved by the host, read by the patterns.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub pos: Vec2,
    pub radius: f32,
}

impl Target {
    pub fn collides_with(&self, projectile: &Projectile) -> bool {
        let reach = self.radius + projectile.radius;
        self.pos.distance_squared(projectile.pos) < reach * reach
    }
}

// ── Frame events ──────────────────────────────────────────────────────────────

/// Things that happened during one `tick`, for the host and for tests.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    PatternStarted { turret: TurretId, pattern: crate::patterns::Pattern },
    /// An aimed sub-emission found the turret sitting on the target.
    EmissionSkipped { turret: TurretId },
    ProjectilesPruned { count: usize },
    TargetHit,
}
