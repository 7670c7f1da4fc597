/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TileType {
    #[default]
    Empty,
    Wall,      // Solid, resolved horizontally first
    Floor,     // Solid, resolved vertically first
    Dirt,      // Floor-like + breakable
    Ladder,    // Passable; climbing is not wired into the player yet
    Spikes,    // Passable hazard
    Exit,      // Passable marker cell under the exit rectangle
    Rock,      // Floor-like, unbreakable
    Breakable, // Floor-like + breakable
    Door,      // Wall-like
}

/// Which axis a solid tile resolves first when the player overlaps it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolidKind {
    FloorLike,
    WallLike,
}

impl TileType {
    /// Does this tile block the player's rectangle?
    pub fn is_solid(self) -> bool {
        self.solid_kind().is_some()
    }

    pub fn solid_kind(self) -> Option<SolidKind> {
        match self {
            TileType::Floor | TileType::Dirt | TileType::Rock | TileType::Breakable => {
                Some(SolidKind::FloorLike)
            }
            TileType::Wall | TileType::Door => Some(SolidKind::WallLike),
            _ => None,
        }
    }

    /// Can `break_tile` turn this into Empty?
    pub fn is_breakable(self) -> bool {
        matches!(self, TileType::Breakable | TileType::Dirt)
    }

    /// Does overlapping this tile hurt the player?
    pub fn is_hazard(self) -> bool {
        matches!(self, TileType::Spikes)
    }

    /// Byte code used by the binary level format.
    pub fn code(self) -> u8 {
        match self {
            TileType::Empty => 0,
            TileType::Wall => 1,
            TileType::Floor => 2,
            TileType::Dirt => 3,
            TileType::Ladder => 4,
            TileType::Spikes => 5,
            TileType::Exit => 6,
            TileType::Rock => 7,
            TileType::Breakable => 8,
            TileType::Door => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<TileType> {
        Some(match code {
            0 => TileType::Empty,
            1 => TileType::Wall,
            2 => TileType::Floor,
            3 => TileType::Dirt,
            4 => TileType::Ladder,
            5 => TileType::Spikes,
            6 => TileType::Exit,
            7 => TileType::Rock,
            8 => TileType::Breakable,
            9 => TileType::Door,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solidity_classes() {
        assert_eq!(TileType::Floor.solid_kind(), Some(SolidKind::FloorLike));
        assert_eq!(TileType::Dirt.solid_kind(), Some(SolidKind::FloorLike));
        assert_eq!(TileType::Wall.solid_kind(), Some(SolidKind::WallLike));
        assert_eq!(TileType::Door.solid_kind(), Some(SolidKind::WallLike));
        for t in [TileType::Empty, TileType::Ladder, TileType::Spikes, TileType::Exit] {
            assert!(!t.is_solid(), "{t:?} should be passable");
        }
    }

    #[test]
    fn only_dirt_and_breakable_break() {
        assert!(TileType::Dirt.is_breakable());
        assert!(TileType::Breakable.is_breakable());
        assert!(!TileType::Rock.is_breakable());
        assert!(!TileType::Wall.is_breakable());
    }

    #[test]
    fn codes_are_stable() {
        for code in 0..=9u8 {
            let t = TileType::from_code(code).unwrap();
            assert_eq!(t.code(), code);
        }
        assert_eq!(TileType::from_code(42), None);
    }
}
