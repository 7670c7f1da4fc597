/// Level: tile grid + entity arena for the current stage.
///
/// ## Per frame
///   `update(dt)`           retire collected diamonds, advance entities
///   `check_collisions(p)`  the resolver, in fixed order:
///       1. tiles (row-major, see `domain::physics`)
///       2. diamonds: collect every overlapping live diamond
///       3. enemies, then spike cells: damage (invincibility caps it at one)
///       4. exit: only counts once no diamonds remain
///
/// Every phase reads the player's bounds after the previous phase's
/// corrections.
///
/// ## Completion
///   `is_level_complete()` ⇔ remaining == 0 ∧ exit_reached.
///   `exit_reached` only flips while remaining == 0, and only once.

use tracing::{debug, info};

use crate::domain::arena::{Arena, Handle};
use crate::domain::entity::{Diamond, DrawSink, Enemy, Entity, ExitMarker};
use crate::domain::geom::{Rect, Vec2};
use crate::domain::grid::{TileGrid, TILE_SIZE};
use crate::domain::physics;
use crate::domain::player::{Player, PLAYER_H};
use crate::domain::tile::TileType;
use super::loader::{self, AssetProvider, LevelLayout};

/// Enemy placement parameters applied at load.
#[derive(Clone, Copy, Debug)]
pub struct LevelTuning {
    pub enemy_speed: f32,
    pub patrol_range: f32,
}

impl Default for LevelTuning {
    fn default() -> Self {
        LevelTuning { enemy_speed: 2.0, patrol_range: 100.0 }
    }
}

/// What the entity phases of `check_collisions` did this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contacts {
    pub damaged: bool,
    /// `exit_reached` flipped to true during this call.
    pub reached_exit: bool,
}

pub struct Level {
    pub number: u32,
    pub grid: TileGrid,
    pub entities: Arena<Entity>,
    exit: Option<Handle<Entity>>,
    /// Player top-left at (re)spawn.
    pub spawn: Vec2,
    pub exit_reached: bool,
    /// Diamonds collected by the last `check_collisions`; cleared on `update`.
    pub collected_this_frame: Vec<Handle<Entity>>,
    total_diamonds: usize,
}

impl Level {
    /// Load level `number`. Never fails: missing or bad data falls back
    /// to the built-in layout.
    pub fn load(number: u32, assets: &dyn AssetProvider, tuning: LevelTuning) -> Level {
        let level = Level::from_layout(number, loader::load_layout(number, assets), tuning);
        info!(
            level = number,
            width = level.grid.width(),
            height = level.grid.height(),
            diamonds = level.total_diamonds,
            "level ready"
        );
        level
    }

    pub fn from_layout(number: u32, layout: LevelLayout, tuning: LevelTuning) -> Level {
        let mut entities = Arena::new();

        for &(cx, cy) in &layout.diamonds {
            entities.insert(Entity::Diamond(Diamond::new(TileGrid::cell_rect(cx, cy).center())));
        }
        for &(cx, cy) in &layout.enemies {
            let r = TileGrid::cell_rect(cx, cy);
            entities.insert(Entity::Enemy(Enemy::new(
                Vec2::new(r.x, r.y),
                tuning.enemy_speed,
                tuning.patrol_range,
            )));
        }
        let exit = match layout.exit() {
            Some((cx, cy)) => Some(entities.insert(Entity::Exit(ExitMarker::new(TileGrid::cell_rect(cx, cy))))),
            None => {
                info!(level = number, "level has no exit");
                None
            }
        };

        let (sx, sy) = layout.spawn_cell();
        let spawn = Vec2::new(sx as f32 * TILE_SIZE, (sy + 1) as f32 * TILE_SIZE - PLAYER_H);

        let mut level = Level {
            number,
            grid: layout.grid,
            entities,
            exit,
            spawn,
            exit_reached: false,
            collected_this_frame: vec![],
            total_diamonds: layout.diamonds.len(),
        };
        level.sync_exit();
        level
    }

    // ── Queries ──

    pub fn remaining_diamonds(&self) -> usize {
        self.entities.values().filter(|e| e.is_live_diamond()).count()
    }

    pub fn diamond_count(&self) -> usize {
        self.total_diamonds
    }

    pub fn is_level_complete(&self) -> bool {
        self.remaining_diamonds() == 0 && self.exit_reached
    }

    pub fn exit_rect(&self) -> Option<Rect> {
        self.exit.and_then(|h| self.entities.get(h)).map(|e| e.bounds())
    }

    // ── Tile passthroughs ──

    pub fn get_tile(&self, x: i32, y: i32) -> TileType {
        self.grid.tile_at(x, y)
    }

    // Terrain edits for scripted levels; play itself never rewrites tiles.
    #[allow(dead_code)]
    pub fn set_tile(&mut self, x: i32, y: i32, tile: TileType) {
        self.grid.set_tile(x, y, tile);
    }

    #[allow(dead_code)]
    pub fn break_tile(&mut self, x: i32, y: i32) {
        self.grid.break_tile(x, y);
    }

    // ── Per frame ──

    pub fn update(&mut self, dt: f32) {
        let retired = self
            .entities
            .retain(|e| !matches!(e, Entity::Diamond(d) if d.collected));
        if !retired.is_empty() {
            debug!(count = retired.len(), "diamonds retired");
        }
        self.collected_this_frame.clear();

        for e in self.entities.values_mut() {
            e.update(dt);
        }
        self.sync_exit();
    }

    pub fn check_collisions(&mut self, player: &mut Player) -> Contacts {
        let mut contacts = Contacts::default();

        physics::resolve_tiles(player, &self.grid);

        let bounds = player.bounds();
        for (h, e) in self.entities.iter_mut() {
            if let Entity::Diamond(d) = e {
                if !d.collected && d.bounds().intersects(&bounds) {
                    d.collect();
                    player.on_collide_with_diamond();
                    self.collected_this_frame.push(h);
                }
            }
        }

        let bounds = player.bounds();
        for e in self.entities.values() {
            if let Entity::Enemy(en) = e {
                if en.bounds().intersects(&bounds) && player.on_collide_with_enemy() {
                    contacts.damaged = true;
                }
            }
        }
        if physics::touches_hazard(&self.grid, &bounds) && player.on_collide_with_enemy() {
            contacts.damaged = true;
        }

        let bounds = player.bounds();
        if let Some(exit) = self.exit_rect() {
            if exit.intersects(&bounds) && self.remaining_diamonds() == 0 {
                if !self.exit_reached {
                    self.exit_reached = true;
                    contacts.reached_exit = true;
                }
                player.on_collide_with_exit();
            }
        }

        self.sync_exit();
        contacts
    }

    /// Mirror "all diamonds taken" onto the exit marker.
    fn sync_exit(&mut self) {
        let open = self.remaining_diamonds() == 0;
        if let Some(Entity::Exit(x)) = self.exit.and_then(|h| self.entities.get_mut(h)) {
            x.open = open;
        }
    }

    pub fn draw(&self, sink: &mut dyn DrawSink) {
        for e in self.entities.values() {
            e.draw(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::player::PlayerTuning;
    use crate::sim::loader::parse_text;

    const DT: f32 = 1.0 / 60.0;

    fn level(rows: &[&str]) -> Level {
        let layout = parse_text(&rows.join("\n")).unwrap();
        Level::from_layout(1, layout, LevelTuning::default())
    }

    fn player_on(level: &Level) -> Player {
        let mut p = Player::new(level.spawn, PlayerTuning::default());
        p.grounded = true;
        p
    }

    /// Put the player's feet on the floor at cell column `cx`.
    fn place(p: &mut Player, cx: i32, floor_row: i32) {
        p.pos = Vec2::new(cx as f32 * TILE_SIZE, floor_row as f32 * TILE_SIZE - PLAYER_H);
        p.prev_pos = p.pos;
    }

    fn frame(level: &mut Level, p: &mut Player) -> Contacts {
        level.update(DT);
        p.update(DT);
        level.check_collisions(p)
    }

    #[test]
    fn spawn_puts_feet_on_cell_bottom() {
        let l = level(&["......", ".P....", "======"]);
        assert_eq!(l.spawn, Vec2::new(32.0, 64.0 - PLAYER_H));
    }

    #[test]
    fn exit_is_gated_by_diamonds() {
        // Diamonds at columns 1, 2, 3; exit at 5; nothing else in the way
        let mut l = level(&[
            "........",
            "........",
            "PDDD.X..",
            "========",
        ]);
        assert_eq!(l.remaining_diamonds(), 3);
        let mut p = player_on(&l);

        // Collect the first two
        for cx in [1, 2] {
            place(&mut p, cx, 3);
            frame(&mut l, &mut p);
        }
        assert_eq!(l.remaining_diamonds(), 1);

        // Walk onto the exit: inert
        place(&mut p, 5, 3);
        let c = frame(&mut l, &mut p);
        assert!(!c.reached_exit);
        assert!(!l.exit_reached);
        assert!(!l.is_level_complete());

        // Third diamond, then back to the exit
        place(&mut p, 3, 3);
        frame(&mut l, &mut p);
        assert_eq!(l.remaining_diamonds(), 0);
        place(&mut p, 5, 3);
        let c = frame(&mut l, &mut p);
        assert!(c.reached_exit);
        assert!(l.exit_reached);
        assert!(l.is_level_complete());

        // Idempotent while standing there
        let c = frame(&mut l, &mut p);
        assert!(!c.reached_exit);
        assert!(l.exit_reached);
    }

    #[test]
    fn several_diamonds_in_one_frame() {
        let mut l = level(&["....", "....", ".DD.", "===="]);
        let mut p = player_on(&l);
        // Straddle both diamond cells
        p.pos = Vec2::new(48.0, 96.0 - PLAYER_H);
        p.prev_pos = p.pos;
        frame(&mut l, &mut p);
        assert_eq!(l.collected_this_frame.len(), 2);
        assert_eq!(p.take_diamond_flag(), 2);
        assert_eq!(l.remaining_diamonds(), 0);

        // Retired on the next update; handles no longer resolve
        let handles = l.collected_this_frame.clone();
        l.update(DT);
        assert!(l.collected_this_frame.is_empty());
        for h in handles {
            assert!(l.entities.get(h).is_none());
        }
    }

    #[test]
    fn remaining_never_increases() {
        let mut l = level(&["......", "......", "PD.D.D", "======"]);
        let mut p = player_on(&l);
        let mut last = l.remaining_diamonds();
        for step in 0..120 {
            p.handle_input(crate::domain::player::PlayerInput { horizontal: 1, jump: false });
            frame(&mut l, &mut p);
            let now = l.remaining_diamonds();
            assert!(now <= last, "step {step}");
            last = now;
        }
        assert_eq!(last, 0);
        assert_eq!(l.diamond_count(), 3);
    }

    #[test]
    fn two_enemies_one_hit() {
        let mut l = level(&["....", "....", ".EE.", "===="]);
        let mut p = player_on(&l);
        p.pos = Vec2::new(48.0, 96.0 - PLAYER_H);
        p.prev_pos = p.pos;
        let c = l.check_collisions(&mut p);
        assert!(c.damaged);
        assert_eq!(p.health, 2);
        assert!(p.invincible);
    }

    #[test]
    fn spikes_respect_invincibility() {
        let mut l = level(&["....", "....", ".^^.", "===="]);
        let mut p = player_on(&l);
        place(&mut p, 1, 3);
        assert!(l.check_collisions(&mut p).damaged);
        assert_eq!(p.health, 2);
        // Still standing in the spikes, still protected
        assert!(!l.check_collisions(&mut p).damaged);
        assert_eq!(p.health, 2);
    }

    #[test]
    fn exitless_level_never_completes() {
        let mut l = level(&["....", "P...", "===="]);
        assert!(l.exit_rect().is_none());
        let mut p = player_on(&l);
        frame(&mut l, &mut p);
        assert_eq!(l.remaining_diamonds(), 0);
        assert!(!l.is_level_complete());
    }

    #[test]
    fn exit_opens_with_last_diamond() {
        let mut l = level(&["....", "....", "PD.X", "===="]);
        let open = |l: &Level| match l.exit.and_then(|h| l.entities.get(h)) {
            Some(Entity::Exit(x)) => x.open,
            _ => panic!("no exit"),
        };
        assert!(!open(&l));
        let mut p = player_on(&l);
        place(&mut p, 1, 3);
        frame(&mut l, &mut p);
        assert!(open(&l));
    }

    #[test]
    fn break_passthrough() {
        let mut l = level(&["B#", "=="]);
        l.break_tile(0, 0);
        l.break_tile(1, 0);
        assert_eq!(l.get_tile(0, 0), TileType::Empty);
        assert_eq!(l.get_tile(1, 0), TileType::Wall);
        l.set_tile(0, 0, TileType::Spikes);
        assert_eq!(l.get_tile(0, 0), TileType::Spikes);
    }
}
