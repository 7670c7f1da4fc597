/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
///   - `level` : tile grid + entity arena for the current stage.
///                Replaced wholesale on advance / restart.
///   - `player`: created once per session, repositioned on (re)start.
///   - `assets`: the level source, handed to every `Level::load`.
///
/// ## Camera / Viewport
///
/// World coordinates (pixels) and screen cells are separate:
///   - `camera`: viewport into the tile grid (top-left cell + size)
///   - Renderer maps: `screen(sx, sy) = cell(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead zone
///   - Grids smaller than the viewport are centered

use crate::domain::player::{Player, PlayerTuning};
use super::level::{Level, LevelTuning};
use super::loader::AssetProvider;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    Respawning,
    LevelComplete,
    GameOver,
    GameComplete,
}

/// Every tunable the simulation reads, copied out of the config.
#[derive(Clone, Copy, Debug)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub level: LevelTuning,
    pub respawn_delay_secs: f32,
    pub complete_delay_secs: f32,
    pub starting_lives: u32,
    pub diamond_score: u32,
    pub level_score: u32,
    /// Levels in a full run; finishing this one ends the game.
    pub level_count: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            player: PlayerTuning::default(),
            level: LevelTuning::default(),
            respawn_delay_secs: 1.0,
            complete_delay_secs: 3.0,
            starting_lives: 3,
            diamond_score: 100,
            level_score: 500,
            level_count: 3,
        }
    }
}

/// Viewport into the grid, in cells.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Left-most visible column (negative when centering a narrow grid)
    pub x: i32,
    /// Top-most visible row
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Scroll only when the target leaves the inner 60% of the viewport.
    pub fn follow(&mut self, target: (i32, i32), world: (usize, usize)) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = follow_axis(self.x, target.0, self.view_w, world.0);
        self.y = follow_axis(self.y, target.1, self.view_h, world.1);
    }

    /// Snap so the target is centered. Used on level load / restart.
    pub fn center_on(&mut self, target: (i32, i32), world: (usize, usize)) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = center_axis(target.0, self.view_w, world.0);
        self.y = center_axis(target.1, self.view_h, world.1);
    }
}

fn clamp_axis(pos: i32, view: usize, world: usize) -> i32 {
    pos.max(0).min((world as i32 - view as i32).max(0))
}

fn follow_axis(pos: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = view as i32 / 5;
    let lo = pos + margin;
    let hi = pos + view as i32 - margin - 1;
    let pos = if target < lo {
        target - margin
    } else if target > hi {
        target - view as i32 + margin + 1
    } else {
        pos
    };
    clamp_axis(pos, view, world)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    clamp_axis(target - view as i32 / 2, view, world)
}

pub struct WorldState {
    // ── Stage ──
    pub level: Level,
    pub player: Player,
    pub assets: Box<dyn AssetProvider>,

    // ── Meta ──
    pub phase: Phase,
    pub paused: bool,
    pub score: u32,
    /// Score when the current level started; restart rolls back to it.
    pub level_start_score: u32,
    pub lives: u32,
    pub diamonds_collected: usize,
    pub frame: u64,
    /// Counts down in Respawning / LevelComplete (seconds).
    pub phase_timer: f32,

    pub tuning: Tuning,

    // ── UI ──
    pub message: String,
    pub message_timer: f32,
    pub camera: Camera,
}

impl WorldState {
    /// Session on the title screen with level 1 preloaded.
    pub fn new(tuning: Tuning, assets: Box<dyn AssetProvider>) -> Self {
        let level = Level::load(1, assets.as_ref(), tuning.level);
        let player = Player::new(level.spawn, tuning.player);
        WorldState {
            level,
            player,
            assets,
            phase: Phase::Title,
            paused: false,
            score: 0,
            level_start_score: 0,
            lives: tuning.starting_lives,
            diamonds_collected: 0,
            frame: 0,
            phase_timer: 0.0,
            tuning,
            message: String::new(),
            message_timer: 0.0,
            camera: Camera::new(),
        }
    }

    pub fn set_message(&mut self, msg: &str, secs: f32) {
        self.message = msg.to_string();
        self.message_timer = secs;
    }

    /// Cell under the player's centre, for the camera.
    pub fn player_cell(&self) -> (i32, i32) {
        let c = self.player.bounds().center();
        crate::domain::grid::TileGrid::cell_of(c.x, c.y)
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.level.grid.width(), self.level.grid.height())
    }
}
