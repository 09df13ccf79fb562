/// Rendering layer.  All terminal I/O lives here.
///
/// Functions here only read the session; they never advance it.
///
/// The simulation runs on a surface finer than the character grid: one
/// terminal cell covers `CELL_W × CELL_H` surface units.  The play area is
/// the inside of the border, columns `1..width-1` and rows `2..height-2`.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal,
    QueueableCommand,
};
use glam::Vec2;
use turret_storm::compute::{score_seconds, GameState};
use turret_storm::entities::{GameStatus, PatternTag, Surface, TurretKind};

pub const CELL_W: f32 = 8.0;
pub const CELL_H: f32 = 16.0;

const PLAY_LEFT: u16 = 1;
const PLAY_TOP: u16 = 2;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::DarkBlue;
const C_HUD_SCORE: Color = Color::White;
const C_HUD_BEST: Color = Color::Yellow;
const C_TARGET: Color = Color::Blue;
const C_TURRET_RADIAL: Color = Color::Red;
const C_TURRET_AIMED: Color = Color::Yellow;
const C_SHOT_RADIAL: Color = Color::Green;
const C_SHOT_AIMED: Color = Color::DarkYellow;
const C_HINT: Color = Color::DarkGrey;

// ── Coordinates ───────────────────────────────────────────────────────────────

/// The surface that fits inside a `width × height` terminal.
pub fn surface_for(width: u16, height: u16) -> Surface {
    Surface::new(
        width.saturating_sub(2).max(1) as f32 * CELL_W,
        height.saturating_sub(4).max(1) as f32 * CELL_H,
    )
}

/// Centre of the cell at terminal `(col, row)`, in surface units.
pub fn surface_point(col: u16, row: u16) -> Vec2 {
    Vec2::new(
        (col.saturating_sub(PLAY_LEFT) as f32 + 0.5) * CELL_W,
        (row.saturating_sub(PLAY_TOP) as f32 + 0.5) * CELL_H,
    )
}

/// Terminal cell holding `pos`, or `None` if it lies outside the play area.
fn cell_of(pos: Vec2, surface: &Surface) -> Option<(u16, u16)> {
    if pos.x < 0.0 || pos.y < 0.0 || pos.x >= surface.width || pos.y >= surface.height {
        return None;
    }
    Some((
        PLAY_LEFT + (pos.x / CELL_W) as u16,
        PLAY_TOP + (pos.y / CELL_H) as u16,
    ))
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// Draw `glyph` at `pos` unless it lies outside the play area.
fn plot<W: Write>(
    out: &mut W,
    pos: Vec2,
    surface: &Surface,
    glyph: &str,
    color: Color,
) -> std::io::Result<()> {
    if let Some((col, row)) = cell_of(pos, surface) {
        out.queue(cursor::MoveTo(col, row))?;
        out.queue(style::SetForegroundColor(color))?;
        out.queue(Print(glyph))?;
    }
    Ok(())
}

/// Draw one whole frame: arena, projectiles, turrets, then the target on
/// top so it is never hidden.
pub fn render<W: Write>(
    out: &mut W,
    state: &GameState,
    best: u64,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    draw_border(out, width, height)?;
    draw_hud(out, state, best, width)?;

    let surface = &state.surface;
    for projectile in &state.projectiles {
        let color = match projectile.tag {
            PatternTag::Radial => C_SHOT_RADIAL,
            PatternTag::Aimed => C_SHOT_AIMED,
        };
        plot(out, projectile.pos, surface, "•", color)?;
    }
    for turret in &state.turrets {
        let color = match turret.kind {
            TurretKind::Radial => C_TURRET_RADIAL,
            TurretKind::Aimed => C_TURRET_AIMED,
        };
        plot(out, turret.pos, surface, "◉", color)?;
    }
    plot(out, state.target.pos, surface, "@", C_TARGET)?;

    draw_controls_hint(out, height)?;
    if state.status == GameStatus::GameOver {
        draw_game_over(out, state, best, width, height)?;
    }

    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, height.saturating_sub(1)))?;
    out.flush()
}

// ── Border ────────────────────────────────────────────────────────────────────

fn draw_border<W: Write>(out: &mut W, width: u16, height: u16) -> std::io::Result<()> {
    let w = width as usize;

    out.queue(style::SetForegroundColor(C_BORDER))?;

    // Row 1: top bar
    out.queue(cursor::MoveTo(0, 1))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(w.saturating_sub(2)))))?;

    // Row h-2: bottom bar
    out.queue(cursor::MoveTo(0, height.saturating_sub(2)))?;
    out.queue(Print(format!("└{}┘", "─".repeat(w.saturating_sub(2)))))?;

    // Side walls
    for row in 2..height.saturating_sub(2) {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(Print("│"))?;
        out.queue(cursor::MoveTo(width.saturating_sub(1), row))?;
        out.queue(Print("│"))?;
    }

    Ok(())
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(
    out: &mut W,
    state: &GameState,
    best: u64,
    width: u16,
) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(style::SetForegroundColor(C_HUD_SCORE))?;
    out.queue(Print(format!("Time:{:>5}s", score_seconds(state))))?;

    if best > 0 {
        let best_str = format!("Best:{:>5}s", best);
        let bx = width.saturating_sub(best_str.chars().count() as u16 + 1);
        out.queue(cursor::MoveTo(bx, 0))?;
        out.queue(style::SetForegroundColor(C_HUD_BEST))?;
        out.queue(Print(&best_str))?;
    }

    let count_str = format!("{} shots", state.projectiles.len());
    let cx = (width / 2).saturating_sub(count_str.len() as u16 / 2);
    out.queue(cursor::MoveTo(cx, 0))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(count_str))?;

    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, height: u16) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print("Mouse / ← ↑ ↓ → / WASD : Move   Q : Quit"))?;
    Ok(())
}

// ── Start menu ────────────────────────────────────────────────────────────────

/// Print `text` horizontally centred on `row`.
fn print_centred<W: Write>(
    out: &mut W,
    cx: u16,
    row: u16,
    text: &str,
    color: Color,
) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(cx.saturating_sub(text.chars().count() as u16 / 2), row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(text))?;
    Ok(())
}

pub fn render_menu<W: Write>(out: &mut W, best: u64) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    let (width, height) = terminal::size()?;
    let cx = width / 2;
    let cy = height / 2;

    print_centred(out, cx, cy.saturating_sub(3), "◉  TURRET  STORM  ◉", Color::Cyan)?;
    if best > 0 {
        let best_str = format!("Longest survival: {}s", best);
        print_centred(out, cx, cy.saturating_sub(2), &best_str, C_HUD_BEST)?;
    }
    print_centred(out, cx, cy, "PRESS SPACE TO START", Color::White)?;
    print_centred(
        out,
        cx,
        cy + 2,
        "Dodge everything. Score is time alive.  Q : Quit",
        C_HINT,
    )?;

    out.queue(style::ResetColor)?;
    out.flush()?;
    Ok(())
}

// ── Game-over overlay ─────────────────────────────────────────────────────────

const GAME_OVER_BOX: [&str; 3] = [
    "╔══════════════════════╗",
    "║   TARGET DESTROYED   ║",
    "╚══════════════════════╝",
];

fn draw_game_over<W: Write>(
    out: &mut W,
    state: &GameState,
    best: u64,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    let survived = score_seconds(state);
    let new_best = survived >= best && survived > 0;

    let cx = width / 2;
    // box, survived, best, hint
    let mut row = (height / 2).saturating_sub((GAME_OVER_BOX.len() as u16 + 3) / 2);

    for line in GAME_OVER_BOX {
        print_centred(out, cx, row, line, Color::Red)?;
        row += 1;
    }

    print_centred(out, cx, row, &format!("Survived: {:>5}s", survived), Color::White)?;
    row += 1;

    if new_best {
        print_centred(out, cx, row, &format!("★ NEW BEST: {:>5}s ★", survived), Color::Yellow)?;
    } else {
        print_centred(out, cx, row, &format!("Best:     {:>5}s", best), Color::DarkGrey)?;
    }
    row += 1;

    print_centred(out, cx, row, "R : Try again   Q : Quit", Color::White)?;
    Ok(())
}
