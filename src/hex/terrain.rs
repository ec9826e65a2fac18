//! Map tile types and their effects

use serde::{Deserialize, Serialize};

/// Terrain of a single map tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    #[default]
    Grass,
    Water,
    Mountain,
}

impl TileType {
    /// Can units march across, cities be built on, and territory grow into this tile?
    pub fn is_passable(&self) -> bool {
        matches!(self, TileType::Grass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_grass_is_passable() {
        assert!(TileType::Grass.is_passable());
        assert!(!TileType::Water.is_passable());
        assert!(!TileType::Mountain.is_passable());
    }

    #[test]
    fn test_serde_lowercase() {
        let t: TileType = serde_json::from_str("\"mountain\"").unwrap();
        assert_eq!(t, TileType::Mountain);
    }
}
