/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Tiles are drawn straight from the grid. Entities and the player go
/// through `DrawSink`, so the simulation never touches the terminal.
/// One tile is 2 columns × 1 row; a column is half a tile (16 units),
/// which gives sprites half-tile horizontal resolution.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{DrawSink, Facing, Sprite};
use crate::domain::geom::Rect;
use crate::domain::grid::TILE_SIZE;
use crate::domain::tile::TileType;
use crate::sim::world::{Camera, Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every "empty" cell. Using the same RGB
    /// for `Clear` and cell backgrounds hides inter-row gaps on VTE
    /// terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Foreground-only write: keeps whatever background is already there.
    fn put_glyph(&mut self, x: usize, y: usize, ch: char, fg: Color) {
        if x < self.width && y < self.height {
            let bg = self.get(x, y).bg;
            self.set(x, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        self.put_str(self.width.saturating_sub(len) / 2, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Glyphs ──

/// Two-column glyph and colors for a tile.
fn tile_glyph(tile: TileType) -> ([char; 2], Color, Color) {
    let bg = Cell::BASE_BG;
    match tile {
        TileType::Empty => ([' ', ' '], Color::White, bg),
        TileType::Wall => (['█', '█'], Color::Rgb { r: 110, g: 110, b: 125 }, bg),
        TileType::Floor => (['▀', '▀'], Color::Rgb { r: 170, g: 120, b: 70 }, Color::Rgb { r: 70, g: 45, b: 25 }),
        TileType::Dirt => (['▒', '▒'], Color::Rgb { r: 150, g: 100, b: 55 }, bg),
        TileType::Ladder => (['╫', '╫'], Color::Rgb { r: 200, g: 170, b: 90 }, bg),
        TileType::Spikes => (['▲', '▲'], Color::Rgb { r: 230, g: 60, b: 60 }, bg),
        TileType::Exit => ([' ', ' '], Color::White, Color::Rgb { r: 30, g: 50, b: 35 }),
        TileType::Rock => (['▓', '▓'], Color::Rgb { r: 130, g: 130, b: 140 }, bg),
        TileType::Breakable => (['░', '░'], Color::Rgb { r: 190, g: 150, b: 100 }, bg),
        TileType::Door => (['▐', '▌'], Color::Rgb { r: 160, g: 90, b: 40 }, bg),
    }
}

/// Glyph for one terminal cell of a sprite. `col`/`row` index into the
/// sprite's own footprint.
fn sprite_glyph(sprite: Sprite, frame: u8, col: usize, row: usize) -> Option<(char, Color)> {
    const PLAYER_C: Color = Color::Rgb { r: 90, g: 220, b: 255 };
    const ENEMY_C: Color = Color::Rgb { r: 255, g: 80, b: 80 };
    match sprite {
        Sprite::Player { blink: true, .. } => None,
        Sprite::Player { facing, .. } => {
            let head = match facing {
                Facing::Left => ['<', ')'],
                Facing::Right => ['(', '>'],
            };
            let legs = if frame % 2 == 0 { ['/', '\\'] } else { ['|', '|'] };
            let g = if row == 0 { head } else { legs };
            Some((g[col.min(1)], PLAYER_C))
        }
        Sprite::Enemy(facing) => {
            let g = match (facing, frame % 2) {
                (Facing::Left, 0) => ['<', 'M'],
                (Facing::Left, _) => ['<', 'W'],
                (Facing::Right, 0) => ['M', '>'],
                (Facing::Right, _) => ['W', '>'],
            };
            Some((g[col.min(1)], ENEMY_C))
        }
        Sprite::Diamond => {
            let ch = if frame % 2 == 0 { '◆' } else { '◇' };
            Some((ch, Color::Rgb { r: 120, g: 240, b: 255 }))
        }
        Sprite::ExitClosed => Some((['[', ']'][col % 2], Color::DarkGrey)),
        Sprite::ExitOpen => Some((['[', ']'][col % 2], Color::Rgb { r: 80, g: 255, b: 120 })),
    }
}

// ── Sprite sink: world rectangles → viewport cells ──

/// World units per terminal column.
const COL_UNITS: f32 = TILE_SIZE / CELL_W as f32;

struct ViewSink<'a> {
    buf: &'a mut FrameBuffer,
    /// Terminal column / row of world origin.
    origin_col: i32,
    origin_row: i32,
    view_cols: usize,
    view_rows: usize,
    top: usize,
}

impl<'a> ViewSink<'a> {
    fn new(buf: &'a mut FrameBuffer, cam: &Camera, top: usize) -> Self {
        ViewSink {
            buf,
            origin_col: -cam.x * CELL_W as i32,
            origin_row: -cam.y,
            view_cols: cam.view_w * CELL_W,
            view_rows: cam.view_h,
            top,
        }
    }
}

impl DrawSink for ViewSink<'_> {
    fn draw_sprite(&mut self, sprite: Sprite, rect: Rect, frame: u8) {
        let cols = ((rect.w / COL_UNITS).round() as usize).max(1);
        let col0 = (rect.x / COL_UNITS).round() as i32 + self.origin_col;
        let row0 = (rect.y / TILE_SIZE).floor() as i32;
        let row1 = ((rect.bottom() - 1.0) / TILE_SIZE).floor() as i32;

        for (r, wy) in (row0..=row1).enumerate() {
            let vy = wy + self.origin_row;
            if vy < 0 || vy as usize >= self.view_rows {
                continue;
            }
            for c in 0..cols {
                let vx = col0 + c as i32;
                if vx < 0 || vx as usize >= self.view_cols {
                    continue;
                }
                if let Some((ch, fg)) = sprite_glyph(sprite, frame, c, r) {
                    self.buf.put_glyph(vx as usize, self.top + vy as usize, ch, fg);
                }
            }
        }
    }
}

// ── Renderer ──

/// Terminal columns per tile.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD, gap, gap, message, help.
const RESERVED_ROWS: usize = MAP_ROW + 3;

const HUD_BG: Color = Color::Rgb { r: 20, g: 24, b: 60 };
const TITLE_C: Color = Color::Rgb { r: 120, g: 240, b: 255 };
const ACCENT_C: Color = Color::Rgb { r: 255, g: 220, b: 60 };
const HINT_C: Color = Color::Rgb { r: 80, g: 255, b: 80 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Render-side animation clock (blinking text).
    tick: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            tick: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        self.tick = self.tick.wrapping_add(1);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.fit_camera(world);

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Size the viewport to the terminal, capped to the grid. Re-centers
    /// when the size changed.
    fn fit_camera(&mut self, world: &mut WorldState) {
        let (gw, gh) = world.grid_size();
        let view_w = (self.term_w / CELL_W).min(gw).max(1);
        let view_h = self.term_h.saturating_sub(RESERVED_ROWS).min(gh).max(1);
        if world.camera.view_w != view_w || world.camera.view_h != view_h {
            world.camera.view_w = view_w;
            world.camera.view_h = view_h;
            let target = world.player_cell();
            world.camera.center_on(target, (gw, gh));
        }
    }

    fn compose(&mut self, w: &WorldState) {
        self.front.clear();
        match w.phase {
            Phase::Title => self.compose_title(w),
            Phase::GameOver => self.compose_game_over(w),
            Phase::GameComplete => self.compose_game_complete(w),
            Phase::Playing => self.compose_game(w),
            Phase::Respawning => {
                self.compose_game(w);
                let text = format!("  OUCH!  Lives left: {}  ", w.lives);
                self.compose_banner(w, &text, Color::Rgb { r: 255, g: 90, b: 90 });
            }
            Phase::LevelComplete => {
                self.compose_game(w);
                let text = format!("  LEVEL {} COMPLETE  ", w.level.number);
                self.compose_banner(w, &text, ACCENT_C);
            }
        }
        if w.paused {
            self.compose_pause_overlay(w);
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave line artifacts.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════
    //  Compose: build front buffer content
    // ══════════════════════════════════════════════════════════

    fn compose_game(&mut self, w: &WorldState) {
        let cam = &w.camera;

        // ── HUD row ──
        let total = w.level.diamond_count();
        let got = total - w.level.remaining_diamonds();
        let hearts: String = (0..w.tuning.player.starting_health)
            .map(|i| if i < w.player.health { '♥' } else { '♡' })
            .collect();
        let exit_status = if total > 0 && got == total { "EXIT OPEN" } else { "" };
        let hud = format!(
            " Level {:<2}  Score {:<7}  ◆ {}/{}  Lives {}  {}  {} ",
            w.level.number, w.score, got, total, w.lives, hearts, exit_status,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Tiles ──
        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            let wy = cam.y + vy as i32;
            for vx in 0..cam.view_w {
                let wx = cam.x + vx as i32;
                let inside = wx >= 0 && wy >= 0
                    && (wx as usize) < w.level.grid.width()
                    && (wy as usize) < w.level.grid.height();
                let tile = if inside { w.level.get_tile(wx, wy) } else { TileType::Empty };
                let (glyph, fg, bg) = tile_glyph(tile);
                for (i, ch) in glyph.iter().enumerate() {
                    self.front.set(vx * CELL_W + i, row, Cell::new(*ch, fg, bg));
                }
            }
        }

        // ── Entities, then the player on top ──
        let mut sink = ViewSink::new(&mut self.front, cam, MAP_ROW);
        w.level.draw(&mut sink);
        w.player.draw(&mut sink);

        // ── Message bar ──
        let msg_row = MAP_ROW + cam.view_h + 1;
        if !w.message.is_empty() {
            let bar = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bar);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, bar);
        }

        // ── Help bar ──
        let help = " ←→/AD:Walk  Space/W:Jump  P:Pause  R:Restart  Esc:Title";
        self.front.put_str(0, msg_row + 1, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_banner(&mut self, w: &WorldState, text: &str, fg: Color) {
        let row = MAP_ROW + w.camera.view_h / 2;
        let len = text.chars().count();
        let x = (w.camera.view_w * CELL_W).saturating_sub(len) / 2;
        self.front.put_str(x, row, text, fg, Color::Rgb { r: 30, g: 30, b: 30 });
    }

    fn compose_title(&mut self, w: &WorldState) {
        let art = [
            "╔══════════════════════════════╗",
            "║     ◆  DIAMOND   RUSH  ◆     ║",
            "╚══════════════════════════════╝",
        ];
        for (i, line) in art.iter().enumerate() {
            self.front.put_centered(3 + i, line, TITLE_C, Color::Reset);
        }

        let info = format!("{} levels  ·  {} lives", w.tuning.level_count, w.tuning.starting_lives);
        self.front.put_centered(7, &info, Color::Grey, Color::Reset);

        let rules = [
            "Collect every diamond to open the exit.",
            "Enemies and spikes cost health; no health costs a life.",
        ];
        for (i, line) in rules.iter().enumerate() {
            self.front.put_centered(9 + i, line, Color::White, Color::Reset);
        }

        let keys = [
            "←→ / A D    walk",
            "Space / W   jump",
            "P           pause",
            "R           restart level",
            "Esc         quit",
        ];
        for (i, line) in keys.iter().enumerate() {
            self.front.put_centered(12 + i, line, Color::DarkGrey, Color::Reset);
        }

        if (self.tick / 20) % 2 == 0 {
            self.front.put_centered(18, "▸ PRESS ENTER ◂", HINT_C, Color::Reset);
        }
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let art = [
            "╔══════════════════════════════╗",
            "║         GAME   OVER          ║",
            "╚══════════════════════════════╝",
        ];
        for (i, line) in art.iter().enumerate() {
            self.front.put_centered(4 + i, line, Color::Rgb { r: 255, g: 60, b: 60 }, Color::Reset);
        }
        self.front.put_centered(9, &format!("◈ Final Score: {}", w.score), Color::White, Color::Reset);
        self.front.put_centered(10, &format!("◈ Reached Level: {}", w.level.number), Color::White, Color::Reset);
        self.front.put_centered(12, "▸ ENTER: Back to Title", HINT_C, Color::Reset);
        self.front.put_centered(13, "▸ ESC:   Quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let art = [
            "╔══════════════════════════════╗",
            "║    ◆  ALL LEVELS CLEARED ◆   ║",
            "╚══════════════════════════════╝",
        ];
        for (i, line) in art.iter().enumerate() {
            self.front.put_centered(4 + i, line, ACCENT_C, Color::Reset);
        }
        self.front.put_centered(9, &format!("◈ Final Score: {}", w.score), Color::White, Color::Reset);
        self.front.put_centered(10, &format!("◈ Lives left: {}", w.lives), Color::White, Color::Reset);
        self.front.put_centered(12, "▸ ENTER: Back to Title", HINT_C, Color::Reset);
        self.front.put_centered(13, "▸ ESC:   Quit", Color::DarkGrey, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let cam = &w.camera;
        let view_cols = cam.view_w * CELL_W;
        let box_w = 28_usize.min(view_cols);
        let box_h = 7_usize.min(cam.view_h);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + cam.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, dim));
            }
        }

        let label = if (self.tick / 8) % 2 == 0 { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 8, box_y + 1, label, ACCENT_C, dim);
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        self.front.put_str(box_x + 2, box_y + 3, "P    Resume", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 4, "R    Restart Level", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 5, "ESC  Back to Title", key_c, dim);
    }
}
