//! Hex geometry - pure tile adjacency, validity and coordinate transforms

pub mod coord;
pub mod grid;
pub mod terrain;

pub use coord::{AxialCoord, HexDirection, TileCoord, EVEN_COLUMN_OFFSETS, ODD_COLUMN_OFFSETS};
pub use grid::MapGrid;
pub use terrain::TileType;
