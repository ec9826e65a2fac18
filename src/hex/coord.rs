//! Hex coordinate system for the game map (odd-q offset coordinates)
//!
//! Tiles are addressed by column `x` and row `y`. Odd columns are shoved down
//! half a tile, so the six neighbor offsets depend on column parity. Axial
//! coordinates are derived when a true hex distance is needed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Neighbor offsets for even columns, indexed by `HexDirection`
pub const EVEN_COLUMN_OFFSETS: [(i32, i32); 6] =
    [(1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (0, 1)];

/// Neighbor offsets for odd columns, indexed by `HexDirection`
pub const ODD_COLUMN_OFFSETS: [(i32, i32); 6] =
    [(1, 1), (1, 0), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Offset tile coordinate on the game map
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn is_odd_column(&self) -> bool {
        self.x & 1 == 1
    }

    /// Offset table for this tile's column parity
    pub fn offsets(&self) -> &'static [(i32, i32); 6] {
        if self.is_odd_column() {
            &ODD_COLUMN_OFFSETS
        } else {
            &EVEN_COLUMN_OFFSETS
        }
    }

    /// Neighbor in one direction
    pub fn neighbor(&self, direction: HexDirection) -> TileCoord {
        let (dx, dy) = self.offsets()[direction.index()];
        TileCoord::new(self.x + dx, self.y + dy)
    }

    /// All 6 neighboring tiles, in `HexDirection::all()` order
    pub fn neighbors(&self) -> [TileCoord; 6] {
        HexDirection::all().map(|d| self.neighbor(d))
    }

    /// Convert to axial coordinates
    pub fn to_axial(&self) -> AxialCoord {
        let q = self.x;
        let r = self.y - (self.x - (self.x & 1)) / 2;
        AxialCoord::new(q, r)
    }

    /// Number of hex steps between two tiles
    pub fn hex_distance(&self, other: &Self) -> u32 {
        self.to_axial().distance(&other.to_axial())
    }

    /// Manhattan distance on raw (x, y); used as the A* heuristic
    pub fn manhattan(&self, other: &Self) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// Linear interpolation between two tile centers in grid space
    pub fn lerp(&self, other: &Self, t: f32) -> (f32, f32) {
        let t = t.clamp(0.0, 1.0);
        (
            self.x as f32 + (other.x - self.x) as f32 * t,
            self.y as f32 + (other.y - self.y) as f32 * t,
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AxialCoord {
    pub q: i32,
    pub r: i32,
}

impl AxialCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Manhattan distance in cube space
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }
}

/// The six hex directions, in offset-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    South,
}

impl HexDirection {
    pub fn index(&self) -> usize {
        match self {
            HexDirection::East => 0,
            HexDirection::NorthEast => 1,
            HexDirection::North => 2,
            HexDirection::NorthWest => 3,
            HexDirection::West => 4,
            HexDirection::South => 5,
        }
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        Self::all()[(self.index() + 3) % 6]
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::North,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::South,
        ]
    }
}
