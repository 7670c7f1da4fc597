/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Every key has a default; a missing file, a missing key or a parse error
/// falls back to defaults. Problems are collected in `warnings` so they
/// can be logged once the subscriber is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::player::PlayerTuning;
use crate::sim::level::LevelTuning;
use crate::sim::world::Tuning;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    pub enemy: EnemyConfig,
    pub game: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub gravity: f32,          // units / frame²
    pub jump_impulse: f32,     // units / frame
    pub walk_speed: f32,       // units / frame
    pub max_fall_speed: f32,   // keep below half a tile or floors get skipped
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_rate: u32,
    pub invincibility_secs: f32,
    pub respawn_delay_secs: f32,
    pub complete_delay_secs: f32,
}

#[derive(Clone, Debug)]
pub struct EnemyConfig {
    pub speed: f32,            // units / frame
    pub patrol_range: f32,     // units either side of the spawn column
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub starting_lives: u32,
    pub starting_health: u32,
    pub diamond_score: u32,
    pub level_score: u32,
    pub level_count: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
    pub restart: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    enemy: TomlEnemy,
    #[serde(default)]
    game: TomlGame,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_jump_impulse")]
    jump_impulse: f32,
    #[serde(default = "default_walk_speed")]
    walk_speed: f32,
    #[serde(default = "default_max_fall")]
    max_fall_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_rate")]
    frame_rate: u32,
    #[serde(default = "default_invincibility")]
    invincibility_secs: f32,
    #[serde(default = "default_respawn_delay")]
    respawn_delay_secs: f32,
    #[serde(default = "default_complete_delay")]
    complete_delay_secs: f32,
}

#[derive(Deserialize, Debug)]
struct TomlEnemy {
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_patrol_range")]
    patrol_range: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGame {
    #[serde(default = "default_lives")]
    starting_lives: u32,
    #[serde(default = "default_health")]
    starting_health: u32,
    #[serde(default = "default_diamond_score")]
    diamond_score: u32,
    #[serde(default = "default_level_score")]
    level_score: u32,
    #[serde(default = "default_level_count")]
    level_count: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump_buttons")]
    jump: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_gravity() -> f32 { 0.5 }
fn default_jump_impulse() -> f32 { 10.0 }   // apex 95 units: two tiles up, not three
fn default_walk_speed() -> f32 { 4.0 }
fn default_max_fall() -> f32 { 15.0 }
fn default_frame_rate() -> u32 { 60 }
fn default_invincibility() -> f32 { 2.0 }
fn default_respawn_delay() -> f32 { 1.0 }
fn default_complete_delay() -> f32 { 3.0 }
fn default_enemy_speed() -> f32 { 2.0 }
fn default_patrol_range() -> f32 { 100.0 }
fn default_lives() -> u32 { 3 }
fn default_health() -> u32 { 3 }
fn default_diamond_score() -> u32 { 100 }
fn default_level_score() -> u32 { 500 }
fn default_level_count() -> u32 { 3 }

fn default_jump_buttons() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "diamondrush.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            gravity: default_gravity(),
            jump_impulse: default_jump_impulse(),
            walk_speed: default_walk_speed(),
            max_fall_speed: default_max_fall(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_rate: default_frame_rate(),
            invincibility_secs: default_invincibility(),
            respawn_delay_secs: default_respawn_delay(),
            complete_delay_secs: default_complete_delay(),
        }
    }
}

impl Default for TomlEnemy {
    fn default() -> Self {
        TomlEnemy { speed: default_enemy_speed(), patrol_range: default_patrol_range() }
    }
}

impl Default for TomlGame {
    fn default() -> Self {
        TomlGame {
            starting_lives: default_lives(),
            starting_health: default_health(),
            diamond_score: default_diamond_score(),
            level_score: default_level_score(),
            level_count: default_level_count(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump_buttons(),
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
            restart: default_restart(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        GameConfig::from_toml(toml_cfg, &search_dirs, warnings)
    }

    /// Parse a config document directly (no file search).
    #[cfg(test)]
    pub fn from_str(text: &str) -> Self {
        let mut warnings = vec![];
        let cfg = parse_toml(text, Path::new("config.toml"), &mut warnings);
        GameConfig::from_toml(cfg, &[], warnings)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf], mut warnings: Vec<String>) -> Self {
        let levels_dir = resolve_dir(&toml_cfg.general.levels_dir, search_dirs);

        let mut frame_rate = toml_cfg.timing.frame_rate;
        if frame_rate == 0 {
            warnings.push("timing.frame_rate must be positive; using 60".into());
            frame_rate = default_frame_rate();
        }

        GameConfig {
            physics: PhysicsConfig {
                gravity: toml_cfg.physics.gravity,
                jump_impulse: toml_cfg.physics.jump_impulse,
                walk_speed: toml_cfg.physics.walk_speed,
                max_fall_speed: toml_cfg.physics.max_fall_speed,
            },
            timing: TimingConfig {
                frame_rate,
                invincibility_secs: toml_cfg.timing.invincibility_secs,
                respawn_delay_secs: toml_cfg.timing.respawn_delay_secs,
                complete_delay_secs: toml_cfg.timing.complete_delay_secs,
            },
            enemy: EnemyConfig {
                speed: toml_cfg.enemy.speed,
                patrol_range: toml_cfg.enemy.patrol_range,
            },
            game: RulesConfig {
                starting_lives: toml_cfg.game.starting_lives.max(1),
                starting_health: toml_cfg.game.starting_health.max(1),
                diamond_score: toml_cfg.game.diamond_score,
                level_score: toml_cfg.game.level_score,
                level_count: toml_cfg.game.level_count.max(1),
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                pause: toml_cfg.gamepad.pause,
                restart: toml_cfg.gamepad.restart,
            },
            levels_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            log_level: toml_cfg.general.log_level,
            warnings,
        }
    }

    /// Simulation tunables.
    pub fn tuning(&self) -> Tuning {
        Tuning {
            player: PlayerTuning {
                gravity: self.physics.gravity,
                jump_impulse: self.physics.jump_impulse,
                walk_speed: self.physics.walk_speed,
                max_fall_speed: self.physics.max_fall_speed,
                invincibility_secs: self.timing.invincibility_secs,
                starting_health: self.game.starting_health,
            },
            level: LevelTuning {
                enemy_speed: self.enemy.speed,
                patrol_range: self.enemy.patrol_range,
            },
            respawn_delay_secs: self.timing.respawn_delay_secs,
            complete_delay_secs: self.timing.complete_delay_secs,
            starting_lives: self.game.starting_lives,
            diamond_score: self.game.diamond_score,
            level_score: self.game.level_score,
            level_count: self.game.level_count,
        }
    }

    /// Fixed simulation step in seconds.
    pub fn frame_secs(&self) -> f32 {
        1.0 / self.timing.frame_rate as f32
    }
}

/// Relative paths are looked up in the candidate dirs; default is CWD-relative.
fn resolve_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so data next to the real binary is found
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First readable config.toml in the candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => return parse_toml(&text, &path, warnings),
            Err(e) => warnings.push(format!("could not read {}: {e}", path.display())),
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, path: &Path, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("{} parse error, using default settings: {e}", path.display()));
            TomlConfig::default()
        }
    }
}
