use std::collections::HashSet;
use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use turret_storm::config::Settings;
use turret_storm::entities::*;
use turret_storm::geometry::*;
use turret_storm::patterns::aimed::*;
use turret_storm::patterns::radial::*;
use turret_storm::patterns::*;
use turret_storm::scheduler::*;
use turret_storm::turret::*;

const EPS: f32 = 1e-4;

/// A bare scheduler plus the sinks a pattern writes to, with a turret parked
/// at (400, 100) and the target straight below it at (400, 500).
struct Rig {
    scheduler: Scheduler<Task>,
    projectiles: Vec<Projectile>,
    events: Vec<FrameEvent>,
    target: Target,
    surface: Surface,
    settings: Settings,
    rng: StdRng,
}

impl Rig {
    fn new() -> Self {
        let surface = Surface::new(800.0, 600.0);
        Self {
            scheduler: Scheduler::new(),
            projectiles: Vec::new(),
            events: Vec::new(),
            target: Target {
                pos: Vec2::new(400.0, 500.0),
                radius: surface.target_radius(),
            },
            surface,
            settings: Settings::default(),
            rng: StdRng::seed_from_u64(42),
        }
    }

    fn ctx(&mut self) -> FireContext<'_, StdRng> {
        FireContext {
            scheduler: &mut self.scheduler,
            projectiles: &mut self.projectiles,
            events: &mut self.events,
            target: &self.target,
            surface: &self.surface,
            settings: &self.settings,
            rng: &mut self.rng,
        }
    }

    fn turret(&mut self, kind: TurretKind) -> Turret {
        let mut t = Turret::spawn(TurretId(0), kind, &self.surface, &mut self.rng);
        t.pos = Vec2::new(400.0, 100.0);
        t.vel_y = 0.0;
        t
    }

    fn invoke(&mut self, turret: &mut Turret, pattern: Pattern) {
        let mut ctx = self.ctx();
        invoke(turret, pattern, &mut ctx);
    }

    /// Fire everything due up to `deadline`.
    fn run(&mut self, turret: &mut Turret, deadline: u64) {
        while let Some((handle, task)) = self.scheduler.pop_until(deadline) {
            let mut ctx = self.ctx();
            dispatch(turret, handle, task, &mut ctx);
        }
    }

    fn angles(&self) -> Vec<f32> {
        self.projectiles.iter().map(|p| p.vel.y.atan2(p.vel.x)).collect()
    }
}

fn assert_heading(p: &Projectile, angle: f32) {
    let dir = p.vel.normalize();
    assert!((dir - heading(angle)).length() < EPS, "{dir:?} vs angle {angle}");
}

// ── Pattern tables ────────────────────────────────────────────────────────────

#[test]
fn pattern_tables_per_kind() {
    let mut settings = Settings::default();
    assert_eq!(TurretKind::Radial.pattern_table(&settings).len(), 4);
    assert_eq!(
        TurretKind::Aimed.pattern_table(&settings),
        &[Pattern::Line, Pattern::Cone, Pattern::Shotgun]
    );
    assert!(!TurretKind::Aimed.pattern_table(&settings).contains(&Pattern::Overtake));

    settings.overtake_enabled = true;
    assert!(TurretKind::Aimed.pattern_table(&settings).contains(&Pattern::Overtake));
    assert_eq!(TurretKind::Radial.pattern_table(&settings), &RADIAL_PATTERNS);
}

#[test]
fn request_fire_draws_every_pattern_eventually() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    let seen: HashSet<Pattern> = (0..200)
        .filter_map(|_| t.request_fire(&mut rig.scheduler, &RADIAL_PATTERNS, 20, &mut rig.rng))
        .collect();
    assert_eq!(seen.len(), RADIAL_PATTERNS.len());
}

#[test]
fn debounced_requests_start_one_pattern() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    t.request_fire(&mut rig.scheduler, &[Pattern::Windmill], 20, &mut rig.rng);
    rig.run(&mut t, 15);
    t.request_fire(&mut rig.scheduler, &[Pattern::RadialBurst], 20, &mut rig.rng);
    rig.run(&mut t, 100);

    let started: Vec<_> = rig
        .events
        .iter()
        .filter_map(|e| match e {
            FrameEvent::PatternStarted { pattern, .. } => Some(*pattern),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![Pattern::RadialBurst]);
    assert!(t.pending_fire().is_none());
    assert!(!rig.projectiles.is_empty());
}

// ── Burst ─────────────────────────────────────────────────────────────────────

#[test]
fn burst_gap_is_one_contiguous_run_inside_the_band() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let gap = rng.gen_range(PI..2.0 * PI);
        let angles = burst_angles(50, gap);
        let missing: Vec<usize> = (0..50)
            .filter(|&i| !angles.contains(&ring_slot(i, 50)))
            .collect();
        assert!(!missing.is_empty());
        assert_eq!(angles.len() + missing.len(), 50);
        assert_eq!(missing[missing.len() - 1] - missing[0] + 1, missing.len());
        for &i in &missing {
            assert!(in_gap(ring_slot(i, 50), gap));
        }
    }
}

#[test]
fn burst_fires_everything_at_once() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    rig.invoke(&mut t, Pattern::RadialBurst);
    // 50 slots minus the 2 to 5 that fall inside the band
    assert!((45..=48).contains(&rig.projectiles.len()), "{}", rig.projectiles.len());
    assert_eq!(rig.scheduler.pending(), 0);
    let speed = rig.surface.speed_unit();
    for p in &rig.projectiles {
        assert_eq!(p.pos, t.pos);
        assert!((p.vel.length() - speed).abs() < EPS);
        assert_eq!(p.tag, PatternTag::Radial);
    }
}

// ── Windmill ──────────────────────────────────────────────────────────────────

#[test]
fn windmill_rings_are_spaced_120ms() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_windmill(&mut t, &mut ctx, 10);
    }
    let expected: Vec<u64> = (0..10).map(|i| i * WINDMILL_SPACING_MS).collect();
    assert_eq!(rig.scheduler.due_times(), expected);
    assert_eq!(t.tracked().len(), 10);

    rig.run(&mut t, 250);
    assert_eq!(rig.projectiles.len(), 60); // rings at 0, 120 and 240
    rig.run(&mut t, 1080);
    assert_eq!(rig.projectiles.len(), 200);
    assert!((t.angular_offset - 10.0 * RING_TWIST).abs() < EPS);
}

#[test]
fn windmill_second_ring_twists() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_windmill(&mut t, &mut ctx, 2);
    }
    rig.run(&mut t, 120);
    // First ring: reference and offset rings coincide at offset 0
    assert_heading(&rig.projectiles[0], 0.0);
    assert_heading(&rig.projectiles[10], 0.0);
    // Second ring: reference fixed, offset ring turned by one twist
    assert_heading(&rig.projectiles[20], 0.0);
    assert_heading(&rig.projectiles[30], RING_TWIST);
    assert_heading(&rig.projectiles[31], RING_TWIST + ring_slot(1, 10));
}

// ── Flower ────────────────────────────────────────────────────────────────────

#[test]
fn flower_shots_mirror_across_the_x_axis() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_flower(&mut t, &mut ctx, 25);
    }
    rig.run(&mut t, 24 * FLOWER_SPACING_MS);
    assert_eq!(rig.projectiles.len(), 50);
    for pair in rig.projectiles.chunks(2) {
        assert!((pair[0].vel.x - pair[1].vel.x).abs() < EPS);
        assert!((pair[0].vel.y + pair[1].vel.y).abs() < EPS);
    }
    assert_heading(&rig.projectiles[2], RING_TWIST);
}

// ── Spiral ────────────────────────────────────────────────────────────────────

#[test]
fn spiral_turns_a_third_of_pi_per_shot() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_spiral(&mut t, &mut ctx, 50);
    }
    assert_eq!(rig.scheduler.due_times().last(), Some(&490));
    rig.run(&mut t, 490);
    assert_eq!(rig.projectiles.len(), 50);
    assert_heading(&rig.projectiles[0], 0.0);
    assert_heading(&rig.projectiles[1], SPIRAL_TWIST);
    assert_heading(&rig.projectiles[2], 2.0 * SPIRAL_TWIST);
}

#[test]
fn offset_carries_over_between_patterns() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_flower(&mut t, &mut ctx, 3);
    }
    rig.run(&mut t, 100);
    {
        let mut ctx = rig.ctx();
        schedule_spiral(&mut t, &mut ctx, 1);
    }
    rig.run(&mut t, 200);
    assert_heading(&rig.projectiles[6], 3.0 * RING_TWIST);
}

// ── Counts ────────────────────────────────────────────────────────────────────

#[test]
fn radial_counts_take_one_of_three_sizes() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        assert!([5, 10, 15].contains(&windmill_ring_count(10, &mut rng)));
        assert!([25, 50, 75].contains(&flower_ring_count(10, &mut rng)));
        assert!([50, 100, 150].contains(&spiral_shot_count(10, &mut rng)));
        // fractional counts round up
        assert!([2, 3, 5].contains(&windmill_ring_count(3, &mut rng)));
        assert!([8, 15, 23].contains(&flower_ring_count(3, &mut rng)));
    }
}

#[test]
fn radial_counts_repeat_with_the_seed() {
    let draw = || {
        let mut rng = StdRng::seed_from_u64(7);
        (0..20)
            .map(|_| windmill_ring_count(10, &mut rng))
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(), draw());
}

// ── Line ──────────────────────────────────────────────────────────────────────

#[test]
fn line_reaims_at_every_shot() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Aimed);
    rig.invoke(&mut t, Pattern::Line);
    let expected: Vec<u64> = (0..20).map(|i| i * LINE_SPACING_MS).collect();
    assert_eq!(rig.scheduler.due_times(), expected);

    rig.run(&mut t, 0);
    assert_eq!(rig.projectiles.len(), 1);
    let speed = 2.0 * rig.surface.speed_unit();
    assert!((rig.projectiles[0].vel - Vec2::new(0.0, speed)).length() < EPS);

    rig.target.pos = Vec2::new(800.0, 100.0);
    rig.run(&mut t, 200);
    assert!((rig.projectiles[1].vel - Vec2::new(speed, 0.0)).length() < EPS);

    rig.run(&mut t, 10_000);
    assert_eq!(rig.projectiles.len(), 20);
}

// ── Cone ──────────────────────────────────────────────────────────────────────

#[test]
fn cone_rows_shrink_by_one() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Aimed);
    rig.invoke(&mut t, Pattern::Cone);
    let mut sizes = Vec::new();
    for row in 0..10 {
        let before = rig.projectiles.len();
        rig.run(&mut t, row * CONE_SPACING_MS);
        sizes.push(rig.projectiles.len() - before);
    }
    assert_eq!(sizes, (1..=10usize).rev().collect::<Vec<_>>());
    assert_eq!(rig.projectiles.len(), 55);
}

#[test]
fn cone_rows_are_centred_on_the_aim() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Aimed);
    rig.invoke(&mut t, Pattern::Cone);
    rig.run(&mut t, 0);
    let angles = rig.angles();
    let mean = angles.iter().sum::<f32>() / angles.len() as f32;
    assert!((mean - FRAC_PI_2).abs() < EPS);
    for pair in angles.windows(2) {
        assert!((pair[1] - pair[0] - AIMED_SPACING).abs() < EPS);
    }
    // Spacing is fixed, not accumulated
    assert!((t.angular_offset - AIMED_SPACING).abs() < EPS);
}

// ── Shotgun ───────────────────────────────────────────────────────────────────

#[test]
fn shotgun_pellets_stay_within_the_spread() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Aimed);
    rig.invoke(&mut t, Pattern::Shotgun);
    assert_eq!(rig.scheduler.due_times(), vec![0, 100, 200, 300, 400]);
    rig.run(&mut t, 400);
    assert_eq!(rig.projectiles.len(), SHOTGUN_WAVES * SHOTGUN_WAVE_SIZE);
    for angle in rig.angles() {
        assert!((angle - FRAC_PI_2).abs() <= SHOTGUN_SPREAD + EPS);
    }
}

// ── Overtake ──────────────────────────────────────────────────────────────────

#[test]
fn overtake_waves_speed_up() {
    let (m0, o0) = overtake_wave_params(0);
    assert!((m0 - 0.6).abs() < EPS);
    assert!((o0 - 0.02 * PI).abs() < EPS);
    let (m19, o19) = overtake_wave_params(19);
    assert!((m19 - 6.3).abs() < EPS);
    assert!((o19 - 0.4 * PI).abs() < EPS);
}

#[test]
fn overtake_fires_twenty_waves_of_five() {
    let mut rig = Rig::new();
    rig.settings.overtake_enabled = true;
    let mut t = rig.turret(TurretKind::Aimed);
    rig.invoke(&mut t, Pattern::Overtake);
    rig.run(&mut t, 0);
    let speed = rig.surface.speed_unit();
    let start = FRAC_PI_2 - 2.5 * OVERTAKE_INNER_STEP + 0.02 * PI;
    for (k, p) in rig.projectiles.iter().enumerate() {
        assert_heading(p, start + k as f32 * OVERTAKE_INNER_STEP);
        assert!((p.vel.length() - 0.6 * speed).abs() < EPS);
    }
    rig.run(&mut t, 1900);
    assert_eq!(rig.projectiles.len(), OVERTAKE_WAVES * OVERTAKE_WAVE_SIZE);
    let last = &rig.projectiles[rig.projectiles.len() - 1];
    assert!((last.vel.length() - 6.3 * speed).abs() < 1e-3);
}

// ── Degenerate aim ────────────────────────────────────────────────────────────

#[test]
fn aimed_emission_on_top_of_target_is_skipped() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Aimed);
    rig.target.pos = t.pos;
    rig.invoke(&mut t, Pattern::Cone);
    rig.invoke(&mut t, Pattern::Line);
    rig.run(&mut t, 0);
    assert!(rig.projectiles.is_empty());
    let skipped = rig
        .events
        .iter()
        .filter(|e| matches!(e, FrameEvent::EmissionSkipped { turret } if *turret == t.id))
        .count();
    assert_eq!(skipped, 2);

    // Later emissions resume once the target moves away
    rig.target.pos = Vec2::new(400.0, 500.0);
    rig.run(&mut t, 200);
    assert_eq!(rig.projectiles.len(), 9 + 1);
}

// ── Teardown ──────────────────────────────────────────────────────────────────

#[test]
fn teardown_stops_a_pattern_mid_flight() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_windmill(&mut t, &mut ctx, 10);
    }
    rig.run(&mut t, 250);
    assert_eq!(rig.projectiles.len(), 60);
    t.teardown(&mut rig.scheduler);
    rig.run(&mut t, 5_000);
    assert_eq!(rig.projectiles.len(), 60);
}

#[test]
fn evicted_emissions_still_stop_after_teardown() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    {
        let mut ctx = rig.ctx();
        schedule_windmill(&mut t, &mut ctx, 5);
        // Bound 3 evicts every windmill handle
        schedule_flower(&mut t, &mut ctx, 3);
    }
    assert_eq!(t.tracked().len(), 3);
    assert_eq!(rig.scheduler.pending(), 8);

    assert_eq!(t.teardown(&mut rig.scheduler), 3);
    assert_eq!(rig.scheduler.pending(), 5); // forgotten but still queued
    rig.run(&mut t, 5_000);
    assert!(rig.projectiles.is_empty());
    assert_eq!(rig.scheduler.pending(), 0);
}

#[test]
fn new_work_after_teardown_runs_normally() {
    let mut rig = Rig::new();
    let mut t = rig.turret(TurretKind::Radial);
    t.teardown(&mut rig.scheduler);
    {
        let mut ctx = rig.ctx();
        schedule_spiral(&mut t, &mut ctx, 3);
    }
    rig.run(&mut t, 20);
    assert_eq!(rig.projectiles.len(), 3);
}
