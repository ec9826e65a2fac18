//! Map grid: a rectangle of tile types in offset coordinates

use serde::{Deserialize, Serialize};

use crate::core::error::{GameError, Result};
use crate::hex::coord::TileCoord;
use crate::hex::terrain::TileType;

/// The full game map. Stored row-major; serialized as `rows[y][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<TileType>>", try_from = "Vec<Vec<TileType>>")]
pub struct MapGrid {
    width: u32,
    height: u32,
    tiles: Vec<TileType>,
}

impl MapGrid {
    /// Create a map filled with one tile type
    pub fn filled(width: u32, height: u32, tile: TileType) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; (width * height) as usize],
        }
    }

    /// Build from `rows[y][x]`, as supplied by the map generator
    pub fn from_rows(rows: Vec<Vec<TileType>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(GameError::InvalidMap("map is empty".into()));
        }
        if let Some(y) = rows.iter().position(|row| row.len() != width) {
            return Err(GameError::InvalidMap(format!(
                "row {} has {} tiles, expected {}",
                y,
                rows[y].len(),
                width
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            tiles: rows.into_iter().flatten().collect(),
        })
    }

    /// Copy back out as `rows[y][x]`
    pub fn to_rows(&self) -> Vec<Vec<TileType>> {
        self.tiles
            .chunks(self.width as usize)
            .map(|row| row.to_vec())
            .collect()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if coordinate is within map bounds
    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width as i32 && coord.y < self.height as i32
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as u32 * self.width + coord.x as u32) as usize)
    }

    /// Tile type at a coordinate, `None` when out of bounds
    pub fn get(&self, coord: TileCoord) -> Option<TileType> {
        self.index(coord).map(|i| self.tiles[i])
    }

    /// Set tile type at a coordinate (ignored when out of bounds)
    pub fn set(&mut self, coord: TileCoord, tile: TileType) {
        if let Some(i) = self.index(coord) {
            self.tiles[i] = tile;
        }
    }

    /// In bounds and passable
    pub fn is_valid_tile(&self, coord: TileCoord) -> bool {
        self.get(coord).is_some_and(|t| t.is_passable())
    }
}

impl From<MapGrid> for Vec<Vec<TileType>> {
    fn from(map: MapGrid) -> Self {
        map.to_rows()
    }
}

impl TryFrom<Vec<Vec<TileType>>> for MapGrid {
    type Error = GameError;

    fn try_from(rows: Vec<Vec<TileType>>) -> Result<Self> {
        MapGrid::from_rows(rows)
    }
}
