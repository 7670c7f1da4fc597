/// Level data: asset provider seam, text / binary parsers, built-in layouts.
///
/// ## Sources (priority order):
///   1. `level_<n>.txt` in the levels directory
///   2. `level_<n>.bin` in the levels directory
///   3. Built-in layouts (levels 1–3 hand-authored, higher numbers
///      generated from a seed equal to the level number)
///
/// Anything missing or malformed is logged and replaced by the built-in
/// layout. Loading never fails.
///
/// ## Text format (`.txt`):
///   One row per line. Lines starting with `;` are comments.
///   Short rows are padded with Empty to the widest row.
///
/// ## Tile legend:
///   '#' = Wall         '=' = Floor        '%' = Dirt
///   'B' = Breakable    'R' = Rock         'H' = Ladder
///   '^' = Spikes       '|' = Door         'X' = Exit
///   'D' = Diamond      'E' = Enemy        'P' = Player start
///   ' ' / '.' = Empty  anything else = Floor
///
/// ## Binary format (`.bin`):
///   u16 LE width, u16 LE height, then width*height cell bytes row-major.
///   0..=9 tile codes (see `TileType::code`), 16 Diamond, 17 Enemy,
///   18 Player start. Entity cells are Empty terrain.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::domain::grid::TileGrid;
use crate::domain::tile::TileType;

const CELL_DIAMOND: u8 = 16;
const CELL_ENEMY: u8 = 17;
const CELL_PLAYER: u8 = 18;

const GEN_WIDTH: usize = 25;
const GEN_HEIGHT: usize = 18;

// ── Errors ──

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {name}")]
    NotFound { name: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelParseError {
    #[error("level data is empty")]
    Empty,

    #[error("binary header truncated ({len} bytes)")]
    TruncatedHeader { len: usize },

    #[error("expected {expected} cell bytes, found {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("level has zero width or height")]
    ZeroSize,

    #[error("unknown cell code {code}")]
    UnknownCell { code: u8 },
}

// ── Asset provider seam ──

/// Raw level data as handed over by an asset provider.
#[derive(Clone, Debug)]
pub enum LevelBlob {
    Text(String),
    Binary(Vec<u8>),
}

impl LevelBlob {
    pub fn parse(&self) -> Result<LevelLayout, LevelParseError> {
        match self {
            LevelBlob::Text(s) => parse_text(s),
            LevelBlob::Binary(b) => parse_binary(b),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LevelBlob::Text(_) => "text",
            LevelBlob::Binary(_) => "binary",
        }
    }
}

pub trait AssetProvider {
    fn level_data(&self, number: u32) -> Result<LevelBlob, AssetError>;
}

/// Reads `level_<n>.txt` / `level_<n>.bin` from a directory.
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        DirectoryAssets { root: root.as_ref().to_path_buf() }
    }
}

impl AssetProvider for DirectoryAssets {
    fn level_data(&self, number: u32) -> Result<LevelBlob, AssetError> {
        let txt = self.root.join(format!("level_{number}.txt"));
        if txt.is_file() {
            return std::fs::read_to_string(&txt)
                .map(LevelBlob::Text)
                .map_err(|source| AssetError::Io { path: txt, source });
        }
        let bin = self.root.join(format!("level_{number}.bin"));
        if bin.is_file() {
            return std::fs::read(&bin)
                .map(LevelBlob::Binary)
                .map_err(|source| AssetError::Io { path: bin, source });
        }
        Err(AssetError::NotFound { name: format!("level_{number}") })
    }
}

/// Provider with no data at all; every level comes from the built-ins.
pub struct NoAssets;

impl AssetProvider for NoAssets {
    fn level_data(&self, number: u32) -> Result<LevelBlob, AssetError> {
        Err(AssetError::NotFound { name: format!("level_{number}") })
    }
}

// ── Parsed layout ──

/// Terrain plus entity cells, before any world-space placement.
#[derive(Clone, Debug)]
pub struct LevelLayout {
    pub grid: TileGrid,
    pub diamonds: Vec<(i32, i32)>,
    pub enemies: Vec<(i32, i32)>,
    pub spawn: Option<(i32, i32)>,
}

impl LevelLayout {
    fn new(width: usize, height: usize) -> Self {
        LevelLayout { grid: TileGrid::new(width, height), diamonds: vec![], enemies: vec![], spawn: None }
    }

    /// First Exit cell in row-major order.
    pub fn exit(&self) -> Option<(i32, i32)> {
        self.grid.cells().find(|&(_, _, t)| t == TileType::Exit).map(|(x, y, _)| (x, y))
    }

    /// Explicit start, or the first empty cell of row 1.
    pub fn spawn_cell(&self) -> (i32, i32) {
        self.spawn.unwrap_or_else(|| {
            let x = (0..self.grid.width() as i32)
                .find(|&x| self.grid.tile_at(x, 1) == TileType::Empty)
                .unwrap_or(0);
            (x, 1)
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Resolve level `number` from the provider, falling back to the built-in
/// layout on any error.
pub fn load_layout(number: u32, assets: &dyn AssetProvider) -> LevelLayout {
    let blob = match assets.level_data(number) {
        Ok(blob) => blob,
        Err(AssetError::NotFound { name }) => {
            info!(level = number, %name, "no level data, using built-in layout");
            return builtin_layout(number);
        }
        Err(e) => {
            warn!(level = number, error = %e, "level data unreadable, using built-in layout");
            return builtin_layout(number);
        }
    };

    match blob.parse() {
        Ok(layout) => {
            info!(level = number, source = blob.kind(), "level data loaded");
            layout
        }
        Err(e) => {
            warn!(level = number, error = %e, "malformed level data, using built-in layout");
            builtin_layout(number)
        }
    }
}

/// Hand-authored layouts for 1–3, generated ones above that.
pub fn builtin_layout(number: u32) -> LevelLayout {
    let rows = match number {
        1 => LEVEL_1,
        2 => LEVEL_2,
        3 => LEVEL_3,
        _ => return generate(number),
    };
    let text = rows.join("\n");
    // Embedded layouts are always well-formed; generate() is the safety net
    parse_text(&text).unwrap_or_else(|_| generate(number))
}

// ══════════════════════════════════════════════════════════════
// Text
// ══════════════════════════════════════════════════════════════

pub fn parse_text(text: &str) -> Result<LevelLayout, LevelParseError> {
    let rows: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.starts_with(';'))
        .collect();
    if rows.is_empty() {
        return Err(LevelParseError::Empty);
    }
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    if width == 0 {
        return Err(LevelParseError::ZeroSize);
    }

    let mut layout = LevelLayout::new(width, rows.len());
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let (x, y) = (x as i32, y as i32);
            let tile = match ch {
                ' ' | '.' => TileType::Empty,
                '#' => TileType::Wall,
                '=' => TileType::Floor,
                '%' => TileType::Dirt,
                'B' => TileType::Breakable,
                'R' => TileType::Rock,
                'H' => TileType::Ladder,
                '^' => TileType::Spikes,
                '|' => TileType::Door,
                'X' => TileType::Exit,
                'D' => {
                    layout.diamonds.push((x, y));
                    TileType::Empty
                }
                'E' => {
                    layout.enemies.push((x, y));
                    TileType::Empty
                }
                'P' => {
                    layout.spawn.get_or_insert((x, y));
                    TileType::Empty
                }
                _ => TileType::Floor,
            };
            layout.grid.set_tile(x, y, tile);
        }
    }
    Ok(layout)
}

// ══════════════════════════════════════════════════════════════
// Binary
// ══════════════════════════════════════════════════════════════

pub fn parse_binary(data: &[u8]) -> Result<LevelLayout, LevelParseError> {
    if data.is_empty() {
        return Err(LevelParseError::Empty);
    }
    if data.len() < 4 {
        return Err(LevelParseError::TruncatedHeader { len: data.len() });
    }
    let width = u16::from_le_bytes([data[0], data[1]]) as usize;
    let height = u16::from_le_bytes([data[2], data[3]]) as usize;
    if width == 0 || height == 0 {
        return Err(LevelParseError::ZeroSize);
    }
    let cells = &data[4..];
    if cells.len() != width * height {
        return Err(LevelParseError::SizeMismatch { expected: width * height, actual: cells.len() });
    }

    let mut layout = LevelLayout::new(width, height);
    for (i, &code) in cells.iter().enumerate() {
        let (x, y) = ((i % width) as i32, (i / width) as i32);
        let tile = match code {
            CELL_DIAMOND => {
                layout.diamonds.push((x, y));
                TileType::Empty
            }
            CELL_ENEMY => {
                layout.enemies.push((x, y));
                TileType::Empty
            }
            CELL_PLAYER => {
                layout.spawn.get_or_insert((x, y));
                TileType::Empty
            }
            _ => TileType::from_code(code).ok_or(LevelParseError::UnknownCell { code })?,
        };
        layout.grid.set_tile(x, y, tile);
    }
    Ok(layout)
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

const LEVEL_1: &[&str] = &[
    "; Level 1 - First Steps",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    "..................D......",
    ".................===.....",
    "...............D.........",
    "..............===........",
    ".........................",
    "....#......===...........",
    ".P..#...D............D.X.",
    "=========================",
];

const LEVEL_2: &[&str] = &[
    "; Level 2 - Patrol",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".................D.......",
    "................===......",
    ".....................D...",
    "....................===..",
    ".........................",
    "..............#..===.....",
    ".P...D...E..D.#.D......X.",
    "=========================",
];

const LEVEL_3: &[&str] = &[
    "; Level 3 - The Climb",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".........................",
    ".....................DX..",
    "....................===..",
    ".................D.......",
    "................===......",
    ".............D...........",
    "............===..........",
    ".........D...............",
    "........===..............",
    ".........................",
    "....===..................",
    ".PD........D..E....D.E...",
    "=========================",
];

/// Seeded layout: full floor and a staircase of platforms rising left to
/// right, two rows per step with a one-column gap, so every step top keeps
/// two clear rows above it. One diamond per step plus one on open floor;
/// enemies and spikes scale with the level.
fn generate(number: u32) -> LevelLayout {
    let mut rng = StdRng::seed_from_u64(number as u64);
    let (w, h) = (GEN_WIDTH as i32, GEN_HEIGHT as i32);
    let ground = h - 2;
    let mut layout = LevelLayout::new(GEN_WIDTH, GEN_HEIGHT);

    for x in 0..w {
        layout.grid.set_tile(x, h - 1, TileType::Floor);
    }

    let mut start = rng.gen_range(4..=6);
    let mut row = ground - 1;
    while row >= 3 && start + 3 <= w - 2 {
        let len = rng.gen_range(3..=4).min(w - 2 - start);
        let tile = match rng.gen_range(0..4) {
            0 => TileType::Dirt,
            1 => TileType::Rock,
            _ => TileType::Floor,
        };
        for x in start..start + len {
            layout.grid.set_tile(x, row, tile);
        }
        layout.diamonds.push((rng.gen_range(start..start + len), row - 1));
        start += len + 1;
        row -= 2;
    }

    // Ground cells with standing room: not under the lowest step, not the exit
    let open: Vec<i32> = (2..w - 2).filter(|&x| !layout.grid.tile_at(x, ground - 1).is_solid()).collect();

    let spike_x = if number >= 5 { open.iter().copied().filter(|&x| x >= 8).choose(&mut rng) } else { None };
    if let Some(sx) = spike_x {
        layout.grid.set_tile(sx, ground, TileType::Spikes);
    }

    if let Some(x) = open.iter().copied().filter(|&x| Some(x) != spike_x).choose(&mut rng) {
        layout.diamonds.push((x, ground));
    }

    let enemy_count = ((number.saturating_sub(1)) / 2).min(4);
    for _ in 0..enemy_count {
        layout.enemies.push((rng.gen_range(6..w - 4), ground));
    }

    layout.spawn = Some((1, ground));
    layout.grid.set_tile(w - 2, ground, TileType::Exit);
    layout
}
