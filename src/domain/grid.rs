/// TileGrid: the level's tile layer.
///
/// Cells are stored row-major in a flat vector. Coordinates are signed so
/// callers can probe past the edges: anything outside `[0,width)×[0,height)`
/// reads as `Wall`, which closes the level without explicit border tiles.
///
/// The only runtime mutation besides `set_tile` is `break_tile`
/// (Dirt / Breakable → Empty).

use super::geom::Rect;
use super::tile::TileType;

/// World units per cell edge.
pub const TILE_SIZE: f32 = 32.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    cells: Vec<TileType>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid {
            width,
            height,
            cells: vec![TileType::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Tile at cell (x, y). Out of bounds = Wall.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> TileType {
        match self.index(x, y) {
            Some(i) => self.cells[i],
            None => TileType::Wall,
        }
    }

    /// Overwrite a cell. Out of bounds is ignored.
    pub fn set_tile(&mut self, x: i32, y: i32, tile: TileType) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = tile;
        }
    }

    /// Dirt / Breakable become Empty; anything else is left alone.
    pub fn break_tile(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            if self.cells[i].is_breakable() {
                self.cells[i] = TileType::Empty;
            }
        }
    }

    /// World rectangle covered by cell (x, y).
    pub fn cell_rect(x: i32, y: i32) -> Rect {
        Rect::new(x as f32 * TILE_SIZE, y as f32 * TILE_SIZE, TILE_SIZE, TILE_SIZE)
    }

    /// Cell containing the world point (wx, wy).
    pub fn cell_of(wx: f32, wy: f32) -> (i32, i32) {
        ((wx / TILE_SIZE).floor() as i32, (wy / TILE_SIZE).floor() as i32)
    }

    /// Every cell whose rectangle strictly overlaps `rect`, row-major.
    /// Cells past the edges are included and report Wall.
    pub fn tiles_overlapping(&self, rect: &Rect) -> Vec<(i32, i32, TileType, Rect)> {
        if rect.w <= 0.0 || rect.h <= 0.0 {
            return vec![];
        }
        let (x0, y0) = Self::cell_of(rect.x, rect.y);
        let x1 = (rect.right() / TILE_SIZE).ceil() as i32 - 1;
        let y1 = (rect.bottom() / TILE_SIZE).ceil() as i32 - 1;

        let mut out = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)).max(0) as usize);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let cell = Self::cell_rect(cx, cy);
                if cell.intersects(rect) {
                    out.push((cx, cy, self.tile_at(cx, cy), cell));
                }
            }
        }
        out
    }

    /// Is any solid tile under the strip just below `rect`'s bottom edge?
    pub fn has_floor_below(&self, rect: &Rect) -> bool {
        let probe = Rect::new(rect.x, rect.bottom(), rect.w, 1.0);
        self.tiles_overlapping(&probe).iter().any(|(_, _, t, _)| t.is_solid())
    }

    /// Row-major iterator over in-bounds cells.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, TileType)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &t)| ((i % w) as i32, (i / w) as i32, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&str]) -> TileGrid {
        let mut g = TileGrid::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let t = match ch {
                    '#' => TileType::Wall,
                    '=' => TileType::Floor,
                    '%' => TileType::Dirt,
                    'B' => TileType::Breakable,
                    'R' => TileType::Rock,
                    _ => TileType::Empty,
                };
                g.set_tile(x as i32, y as i32, t);
            }
        }
        g
    }

    #[test]
    fn out_of_bounds_is_wall() {
        let g = grid_from(&["   ", "   "]);
        for &(x, y) in &[(-1, 0), (0, -1), (3, 0), (0, 2), (-5, -5), (100, 100)] {
            assert_eq!(g.tile_at(x, y), TileType::Wall, "({x},{y})");
        }
        assert_eq!(g.tile_at(2, 1), TileType::Empty);
    }

    #[test]
    fn set_out_of_bounds_is_noop() {
        let mut g = grid_from(&["  "]);
        let before = g.clone();
        g.set_tile(5, 0, TileType::Floor);
        g.set_tile(-1, 0, TileType::Floor);
        assert_eq!(g, before);
    }

    #[test]
    fn break_only_affects_breakables() {
        let mut g = grid_from(&["#=R%B"]);
        let before = g.clone();
        g.break_tile(0, 0);
        g.break_tile(1, 0);
        g.break_tile(2, 0);
        assert_eq!(g, before);

        g.break_tile(3, 0);
        g.break_tile(4, 0);
        assert_eq!(g.tile_at(3, 0), TileType::Empty);
        assert_eq!(g.tile_at(4, 0), TileType::Empty);
    }

    #[test]
    fn break_is_idempotent() {
        let mut once = grid_from(&["B "]);
        once.break_tile(0, 0);
        let mut twice = grid_from(&["B "]);
        twice.break_tile(0, 0);
        twice.break_tile(0, 0);
        assert_eq!(once, twice);
        // Off-grid break is silently ignored
        twice.break_tile(-3, 9);
        assert_eq!(once, twice);
    }

    #[test]
    fn overlapping_cells_are_row_major() {
        let g = grid_from(&["    ", "    ", "    "]);
        // Straddles cells (1,0),(2,0),(1,1),(2,1)
        let r = Rect::new(40.0, 10.0, 40.0, 30.0);
        let cells: Vec<(i32, i32)> = g.tiles_overlapping(&r).iter().map(|c| (c.0, c.1)).collect();
        assert_eq!(cells, vec![(1, 0), (2, 0), (1, 1), (2, 1)]);
    }

    #[test]
    fn overlapping_includes_border_walls() {
        let g = grid_from(&["  "]);
        let r = Rect::new(-8.0, 0.0, 16.0, 16.0);
        let cells = g.tiles_overlapping(&r);
        assert_eq!(cells[0].0, -1);
        assert_eq!(cells[0].2, TileType::Wall);
        assert_eq!(cells[1].2, TileType::Empty);
    }

    #[test]
    fn edge_aligned_rect_touches_no_extra_cells() {
        let g = grid_from(&["  ", "  "]);
        let r = Rect::new(0.0, 0.0, TILE_SIZE, TILE_SIZE);
        assert_eq!(g.tiles_overlapping(&r).len(), 1);
    }

    #[test]
    fn floor_probe() {
        let g = grid_from(&["  ", "= "]);
        assert!(g.has_floor_below(&Rect::new(0.0, 0.0, 32.0, 32.0)));
        assert!(!g.has_floor_below(&Rect::new(33.0, 0.0, 30.0, 32.0)));
    }
}
