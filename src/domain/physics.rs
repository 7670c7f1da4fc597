/// Tile collision resolution for the player rectangle.
///
/// ## Attribution
///
/// After `Player::update` the player's rectangle may overlap solid cells.
/// For each overlapped cell we decide which edge caused the overlap by
/// comparing the player's PREVIOUS rectangle against the cell:
///
///   descending (vel.y > 0) and prev.bottom <= cell.top     → ground
///   ascending  (vel.y < 0) and prev.top    >= cell.bottom  → ceiling
///   moving right           and prev.right  <= cell.left    → wall (left face)
///   moving left            and prev.left   >= cell.right   → wall (right face)
///
/// Floor-like tiles try the vertical test first, wall-like tiles the
/// horizontal one; either falls back to the other axis. An overlap that
/// fits neither test (speed large enough to skip an edge) is left alone.
///
/// ## Order
///
/// Cells are visited row-major. Every test uses the player's CURRENT
/// rectangle, so a correction from an earlier cell can clear a later
/// overlap. With contradictory corrections the later cell wins.
///
/// ## Support
///
/// After all cells: a grounded player with no solid cell under the feet
/// leaves the ground (walked off a ledge, or the floor was broken).

use super::geom::Rect;
use super::grid::TileGrid;
use super::player::{Player, PLAYER_H, PLAYER_W};
use super::tile::{SolidKind, TileType};

/// Slack for the previous-edge comparisons.
const EDGE_EPS: f32 = 0.01;

/// What a single cell did to the player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Contact {
    None,
    Ground,
    Ceiling,
    Wall,
}

// ══════════════════════════════════════════════════════════════
// Grid pass
// ══════════════════════════════════════════════════════════════

/// Resolve the player against every solid cell it overlaps, then drop
/// support if nothing is underneath.
pub fn resolve_tiles(player: &mut Player, grid: &TileGrid) {
    for (_, _, tile, cell) in grid.tiles_overlapping(&player.bounds()) {
        resolve_tile(player, cell, tile);
    }

    if player.grounded && !grid.has_floor_below(&player.bounds()) {
        player.on_leave_ground();
    }
}

/// Hazard cells (spikes) overlapped by `rect`.
pub fn touches_hazard(grid: &TileGrid, rect: &Rect) -> bool {
    grid.tiles_overlapping(rect).iter().any(|(_, _, t, _)| t.is_hazard())
}

// ══════════════════════════════════════════════════════════════
// Single cell
// ══════════════════════════════════════════════════════════════

/// Resolve against one cell rectangle of the given type.
pub fn resolve_tile(player: &mut Player, cell: Rect, tile: TileType) -> Contact {
    let kind = match tile.solid_kind() {
        Some(k) => k,
        None => return Contact::None,
    };
    if !player.bounds().intersects(&cell) {
        return Contact::None;
    }

    match kind {
        SolidKind::FloorLike => match resolve_vertical(player, cell) {
            Contact::None => resolve_horizontal(player, cell),
            c => c,
        },
        SolidKind::WallLike => match resolve_horizontal(player, cell) {
            Contact::None => resolve_vertical(player, cell),
            c => c,
        },
    }
}

fn resolve_vertical(player: &mut Player, cell: Rect) -> Contact {
    let prev = player.prev_bounds();

    if player.vel.y > 0.0 && prev.bottom() <= cell.y + EDGE_EPS {
        player.on_collide_with_ground();
        player.pos.y = cell.y - PLAYER_H;
        return Contact::Ground;
    }
    if player.vel.y < 0.0 && prev.y >= cell.bottom() - EDGE_EPS {
        player.on_collide_with_ceiling();
        player.pos.y = cell.bottom();
        return Contact::Ceiling;
    }
    Contact::None
}

fn resolve_horizontal(player: &mut Player, cell: Rect) -> Contact {
    let prev = player.prev_bounds();

    if player.vel.x > 0.0 && prev.right() <= cell.x + EDGE_EPS {
        player.on_collide_with_wall();
        player.pos.x = cell.x - PLAYER_W;
        return Contact::Wall;
    }
    if player.vel.x < 0.0 && prev.x >= cell.right() - EDGE_EPS {
        player.on_collide_with_wall();
        player.pos.x = cell.right();
        return Contact::Wall;
    }
    Contact::None
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::Vec2;
    use crate::domain::player::{PlayerInput, PlayerState, PlayerTuning};

    const DT: f32 = 1.0 / 60.0;

    fn grid_from(rows: &[&str]) -> TileGrid {
        let mut g = TileGrid::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let t = match ch {
                    '#' => TileType::Wall,
                    '=' => TileType::Floor,
                    '^' => TileType::Spikes,
                    'B' => TileType::Breakable,
                    _ => TileType::Empty,
                };
                g.set_tile(x as i32, y as i32, t);
            }
        }
        g
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(Vec2::new(x, y), PlayerTuning::default())
    }

    fn frame(p: &mut Player, g: &TileGrid, input: PlayerInput) {
        p.handle_input(input);
        p.update(DT);
        resolve_tiles(p, g);
    }

    const RIGHT: PlayerInput = PlayerInput { horizontal: 1, jump: false };
    const IDLE: PlayerInput = PlayerInput { horizontal: 0, jump: false };

    // ── single cell ──

    #[test]
    fn descending_onto_floor_snaps_to_top() {
        // Bottom at 100 before motion, moving down 5, tile top at 102
        let mut p = player_at(0.0, 100.0 - PLAYER_H);
        p.vel.y = 5.0;
        p.state = PlayerState::Falling;
        p.prev_pos = p.pos;
        p.pos.y += 5.0;

        let c = resolve_tile(&mut p, Rect::new(0.0, 102.0, 32.0, 32.0), TileType::Floor);
        assert_eq!(c, Contact::Ground);
        assert!(p.grounded);
        assert_eq!(p.vel.y, 0.0);
        assert_eq!(p.bounds().bottom(), 102.0);
        assert_eq!(p.state, PlayerState::Idle);
    }

    #[test]
    fn passable_tiles_never_correct() {
        let mut p = player_at(0.0, 0.0);
        p.vel.y = 5.0;
        p.pos.y = 5.0;
        for t in [TileType::Empty, TileType::Ladder, TileType::Spikes, TileType::Exit] {
            assert_eq!(resolve_tile(&mut p, Rect::new(0.0, 40.0, 32.0, 32.0), t), Contact::None);
        }
        assert_eq!(p.pos.y, 5.0);
    }

    #[test]
    fn wall_tile_falls_back_to_vertical() {
        // Straight down onto a wall cell: horizontal test cannot apply
        let mut p = player_at(0.0, 0.0);
        p.vel.y = 4.0;
        p.pos.y = 4.0;
        let c = resolve_tile(&mut p, Rect::new(0.0, 50.0, 32.0, 32.0), TileType::Wall);
        assert_eq!(c, Contact::Ground);
        assert_eq!(p.pos.y, 50.0 - PLAYER_H);
    }

    // ── full grid ──

    #[test]
    fn falls_and_lands_on_floor() {
        let g = grid_from(&["   ", "   ", "===", "   "]);
        let mut p = player_at(0.0, 0.0);
        for _ in 0..60 {
            frame(&mut p, &g, IDLE);
        }
        assert!(p.grounded);
        assert_eq!(p.vel.y, 0.0);
        assert_eq!(p.pos.y, 64.0 - PLAYER_H);
        assert_eq!(p.state, PlayerState::Idle);
    }

    #[test]
    fn wall_stops_walking_player() {
        let g = grid_from(&["  #", "  #", "==="]);
        let mut p = player_at(0.0, 64.0 - PLAYER_H);
        p.grounded = true;
        for _ in 0..20 {
            frame(&mut p, &g, RIGHT);
            assert!(p.bounds().right() <= 64.0);
        }
        assert_eq!(p.pos.x, 32.0);
        assert_eq!(p.vel.x, 0.0);
        assert!(p.grounded);
        assert_eq!(p.state, PlayerState::Pushing);
    }

    #[test]
    fn border_acts_as_wall() {
        let g = grid_from(&["  ", "  ", "=="]);
        let mut p = player_at(0.0, 64.0 - PLAYER_H);
        p.grounded = true;
        for _ in 0..5 {
            frame(&mut p, &g, PlayerInput { horizontal: -1, jump: false });
        }
        assert_eq!(p.pos.x, 0.0);
    }

    #[test]
    fn ceiling_stops_jump() {
        let g = grid_from(&["===", "   ", "   ", "   ", "==="]);
        let mut p = player_at(0.0, 128.0 - PLAYER_H);
        p.grounded = true;
        frame(&mut p, &g, PlayerInput { horizontal: 0, jump: true });

        let mut min_y = p.pos.y;
        for _ in 0..120 {
            frame(&mut p, &g, IDLE);
            min_y = min_y.min(p.pos.y);
        }
        assert_eq!(min_y, 32.0);
        assert!(p.grounded);
        assert_eq!(p.pos.y, 128.0 - PLAYER_H);
    }

    #[test]
    fn walking_off_ledge_starts_falling() {
        let g = grid_from(&["   ", "   ", "=  ", "   ", "   "]);
        let mut p = player_at(0.0, 64.0 - PLAYER_H);
        p.grounded = true;
        let mut frames = 0;
        while p.grounded {
            frame(&mut p, &g, RIGHT);
            frames += 1;
            assert!(frames < 20);
        }
        assert_eq!(p.state, PlayerState::Falling);
        assert_eq!(p.pos.x, 32.0);
    }

    #[test]
    fn broken_floor_drops_player() {
        let mut g = grid_from(&["  ", "  ", "BB", "  "]);
        let mut p = player_at(0.0, 64.0 - PLAYER_H);
        p.grounded = true;
        frame(&mut p, &g, IDLE);
        assert!(p.grounded);

        g.break_tile(0, 2);
        frame(&mut p, &g, IDLE);
        assert!(!p.grounded);
        assert_eq!(p.state, PlayerState::Falling);
    }

    #[test]
    fn resting_player_stays_put() {
        let g = grid_from(&["  ", "  ", "=="]);
        let mut p = player_at(0.0, 64.0 - PLAYER_H);
        p.grounded = true;
        for _ in 0..30 {
            frame(&mut p, &g, IDLE);
        }
        assert!(p.grounded);
        assert_eq!(p.pos, Vec2::new(0.0, 16.0));
    }

    #[test]
    fn spikes_are_hazards_not_floors() {
        let g = grid_from(&["  ", "^^"]);
        assert!(touches_hazard(&g, &Rect::new(0.0, 20.0, 32.0, 20.0)));
        assert!(!touches_hazard(&g, &Rect::new(0.0, 0.0, 32.0, 32.0)));
        assert!(!g.has_floor_below(&Rect::new(0.0, 0.0, 32.0, 32.0)));
    }
}
