mod display;

use std::collections::HashMap;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal, ExecutableCommand,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turret_storm::compute::{
    end_session, init_state, move_target, nudge_target, score_seconds, tick, GameState,
};
use turret_storm::config::Settings;
use turret_storm::entities::GameStatus;
use turret_storm::scheduler::FrameClock;

use display::{surface_for, surface_point, CELL_H, CELL_W};

const FRAME: Duration = Duration::from_millis(16); // ≈60 FPS

/// Min frames between keyboard steps while a direction key is held.
const MOVE_COOLDOWN: u32 = 3;

/// Frames a key stays held after its last press or repeat.  Key repeat
/// runs at 15 Hz or faster, which refreshes an 8-frame window in time.
const HOLD_WINDOW: u64 = 8;

const LEFT_KEYS: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const RIGHT_KEYS: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const UP_KEYS: [KeyCode; 3] = [KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const DOWN_KEYS: [KeyCode; 3] = [KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];

/// A resize restarts the session once the terminal has stopped changing
/// size for this long.
const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Turret Storm: a terminal bullet hell", long_about = None)]
struct Args {
    /// JSON settings file; the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base projectile multiplier for radial turrets
    #[arg(long)]
    radial: Option<u32>,

    /// Base projectile multiplier for aimed turrets
    #[arg(long)]
    aimed: Option<u32>,

    /// Number of radial turrets per game
    #[arg(long)]
    radial_turrets: Option<u32>,

    /// Number of aimed turrets per game
    #[arg(long)]
    aimed_turrets: Option<u32>,

    /// Let aimed turrets use the overtake wave
    #[arg(long, default_value_t = false)]
    hard: bool,

    /// Seed for a replayable run
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs here (the terminal itself is busy drawing the game)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(n) = args.radial {
        settings.num_radial_projectiles = n;
    }
    if let Some(n) = args.aimed {
        settings.num_aimed_projectiles = n;
    }
    if let Some(n) = args.radial_turrets {
        settings.radial_turret_number = n;
    }
    if let Some(n) = args.aimed_turrets {
        settings.aimed_turret_number = n;
    }
    if args.hard {
        settings.overtake_enabled = true;
    }
    settings.validate()?;
    Ok(settings)
}

fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn any_held(last_seen: &HashMap<KeyCode, u64>, keys: &[KeyCode], frame: u64) -> bool {
    keys.iter().any(|key| {
        last_seen
            .get(key)
            .is_some_and(|&seen| frame.saturating_sub(seen) <= HOLD_WINDOW)
    })
}

// ── Best-time persistence ─────────────────────────────────────────────────────

fn best_time_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".turret_storm_best")
}

fn load_best_time() -> u64 {
    std::fs::read_to_string(best_time_path())
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

fn save_best_time(seconds: u64) {
    if let Err(err) = std::fs::write(best_time_path(), seconds.to_string()) {
        tracing::warn!(%err, "could not save best time");
    }
}

// ── Menu ──────────────────────────────────────────────────────────────────────

/// Blocks until Space (`true`) or a quit key (`false`).
fn wait_for_start<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>, best: u64) -> Result<bool> {
    display::render_menu(out, best)?;

    while let Ok(ev) = rx.recv() {
        match ev {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                modifiers,
                ..
            }) => match code {
                KeyCode::Char(' ') => return Ok(true),
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(false),
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(false)
                }
                _ => {}
            },
            Event::Resize(_, _) => display::render_menu(out, best)?,
            _ => {}
        }
    }
    Ok(false)
}

// ── Game loop ─────────────────────────────────────────────────────────────────

enum LoopExit {
    Quit,
    Restart,
    Menu,
}

/// Runs one session until the player quits, restarts or resizes the
/// terminal.  The session is always torn down before returning.
fn game_loop<W: Write>(
    out: &mut W,
    state: &mut GameState,
    best: u64,
    rx: &mpsc::Receiver<Event>,
    rng: &mut StdRng,
) -> Result<LoopExit> {
    let (width, height) = terminal::size()?;

    let mut last_seen: HashMap<KeyCode, u64> = HashMap::new();
    let mut move_cooldown: u32 = 0;
    let mut frame: u64 = 0;
    let mut resize_deadline: Option<Instant> = None;
    let mut clock = FrameClock::new();
    let mut last_tick = Instant::now();

    let exit = loop {
        let frame_start = Instant::now();
        frame += 1;

        // ── Input ─────────────────────────────────────────────────────────────
        let mut requested = None;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                Event::Key(KeyEvent { code, kind, modifiers, .. }) => match kind {
                    KeyEventKind::Press => {
                        last_seen.insert(code, frame);
                        match code {
                            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                                requested = Some(LoopExit::Quit);
                            }
                            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                                requested = Some(LoopExit::Quit);
                            }
                            KeyCode::Char('r') | KeyCode::Char('R')
                                if state.status == GameStatus::GameOver =>
                            {
                                requested = Some(LoopExit::Restart);
                            }
                            _ => {}
                        }
                    }
                    KeyEventKind::Repeat => {
                        last_seen.insert(code, frame);
                    }
                    KeyEventKind::Release => {
                        last_seen.remove(&code);
                    }
                },
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Moved | MouseEventKind::Drag(_),
                    column,
                    row,
                    ..
                }) if state.status == GameStatus::Playing => {
                    let p = surface_point(column, row);
                    *state = move_target(state, p.x, p.y);
                }
                Event::Resize(_, _) => resize_deadline = Some(Instant::now() + RESIZE_DEBOUNCE),
                _ => {}
            }
        }
        if let Some(exit) = requested {
            break exit;
        }

        if resize_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("terminal resized, back to menu");
            break LoopExit::Menu;
        }

        // ── Steering ──────────────────────────────────────────────────────────
        if state.status == GameStatus::Playing && move_cooldown == 0 {
            let left = any_held(&last_seen, &LEFT_KEYS, frame);
            let right = any_held(&last_seen, &RIGHT_KEYS, frame);
            let up = any_held(&last_seen, &UP_KEYS, frame);
            let down = any_held(&last_seen, &DOWN_KEYS, frame);

            let dx = (right as i8 - left as i8) as f32 * CELL_W;
            let dy = (down as i8 - up as i8) as f32 * CELL_H;
            if dx != 0.0 || dy != 0.0 {
                *state = nudge_target(state, dx, dy);
                move_cooldown = MOVE_COOLDOWN;
            }
        }
        move_cooldown = move_cooldown.saturating_sub(1);

        let now = Instant::now();
        let step_ms = clock.step(now - last_tick);
        last_tick = now;
        if state.status == GameStatus::Playing {
            *state = tick(state, step_ms, rng);
        }

        display::render(out, state, best, width, height)?;

        let spent = frame_start.elapsed();
        if spent < FRAME {
            std::thread::sleep(FRAME - spent);
        }
    };

    *state = end_session(state);
    Ok(exit)
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Raw mode, alternate screen and mouse reporting.  Returns whether the
/// terminal accepted the key-release protocol.
fn enter_terminal<W: Write>(out: &mut W) -> Result<bool> {
    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?
        .execute(cursor::Hide)?
        .execute(EnableMouseCapture)?;
    // Without release events, held keys fall back to HOLD_WINDOW
    let enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();
    Ok(enhanced)
}

/// Best effort: runs on the error path too.
fn leave_terminal<W: Write>(out: &mut W, enhanced: bool) {
    if enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(DisableMouseCapture);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Blocking reads happen on their own thread; the game loop only polls the
/// channel.
fn spawn_input_thread() -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break;
            }
        }
    });
    rx
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let settings = build_settings(&args)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(?settings, seed = ?args.seed, "starting");

    let mut out = BufWriter::new(stdout());
    let enhanced = enter_terminal(&mut out)?;
    let rx = spawn_input_thread();

    let result = run(&mut out, &rx, &settings, &mut rng);
    leave_terminal(&mut out, enhanced);
    result
}

fn run<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    settings: &Settings,
    rng: &mut StdRng,
) -> Result<()> {
    let mut best = load_best_time();

    'menu: while wait_for_start(out, rx, best)? {
        loop {
            let (width, height) = terminal::size()?;
            let mut state = init_state(settings.clone(), surface_for(width, height), rng);
            let exit = game_loop(out, &mut state, best, rx, rng)?;

            let survived = score_seconds(&state);
            info!(survived, best, "session over");
            if survived > best {
                best = survived;
                save_best_time(best);
            }

            match exit {
                LoopExit::Quit => break 'menu,
                LoopExit::Restart => continue,
                LoopExit::Menu => continue 'menu,
            }
        }
    }
    Ok(())
}
