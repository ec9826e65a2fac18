//! Battle units - one per queued army card, walking a precomputed path

use serde::{Deserialize, Serialize};

use crate::battle::constants::{MIN_ATTACK_INTERVAL, MIN_UNIT_SPEED, PROGRESS_EPSILON};
use crate::cards::UnitStats;
use crate::core::types::{CardId, PlayerId, UnitId};
use crate::hex::TileCoord;

/// An attacking unit in flight
#[derive(Debug, Clone, PartialEq)]
pub struct BattleUnit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub card_id: CardId,
    /// Source city first, target city last
    pub path: Vec<TileCoord>,
    /// Index of the tile the unit currently stands on
    pub path_index: usize,
    /// Fraction of the edge towards `path[path_index + 1]`
    pub progress: f32,
    pub health: f32,
    pub max_health: f32,
    /// Tiles per second
    pub speed: f32,
    pub damage: f32,
    pub range: u32,
    pub attack_interval: f32,
    pub cooldown: f32,
    pub city_damage: u32,
    pub target_city: TileCoord,
}

impl BattleUnit {
    pub fn new(
        id: UnitId,
        owner: PlayerId,
        card_id: CardId,
        stats: &UnitStats,
        path: Vec<TileCoord>,
        target_city: TileCoord,
    ) -> Self {
        Self {
            id,
            owner,
            card_id,
            path,
            path_index: 0,
            progress: 0.0,
            health: stats.health,
            max_health: stats.health,
            speed: stats.speed.max(MIN_UNIT_SPEED),
            damage: stats.damage,
            range: stats.range,
            attack_interval: stats.attack_interval.max(MIN_ATTACK_INTERVAL),
            cooldown: 0.0,
            city_damage: stats.city_damage,
            target_city,
        }
    }

    /// Tile the unit currently stands on
    pub fn tile(&self) -> TileCoord {
        self.path
            .get(self.path_index)
            .or_else(|| self.path.last())
            .copied()
            .unwrap_or(self.target_city)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Standing on the final path tile
    pub fn is_at_end(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }

    /// Interpolated grid position between the current and next tile
    pub fn position(&self) -> (f32, f32) {
        let here = self.tile();
        match self.path.get(self.path_index + 1) {
            Some(next) => here.lerp(next, self.progress),
            None => (here.x as f32, here.y as f32),
        }
    }

    /// Advance along the path by `speed * dt` tiles, snapping to each tile crossed
    pub fn advance(&mut self, dt: f32) {
        if self.is_at_end() {
            self.progress = 0.0;
            return;
        }

        self.progress += self.speed * dt;
        while self.progress >= 1.0 - PROGRESS_EPSILON {
            self.progress = (self.progress - 1.0).max(0.0);
            self.path_index += 1;
            if self.is_at_end() {
                self.progress = 0.0;
                break;
            }
        }
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        let (x, y) = self.position();
        UnitSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            tile: self.tile(),
            x,
            y,
            health: self.health,
        }
    }
}

/// What clients see of a unit each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub owner: PlayerId,
    pub tile: TileCoord,
    pub x: f32,
    pub y: f32,
    pub health: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(speed: f32) -> UnitStats {
        UnitStats {
            health: 10.0,
            speed,
            damage: 1.0,
            range: 1,
            attack_interval: 1.0,
            city_damage: 3,
        }
    }

    fn row(len: i32) -> Vec<TileCoord> {
        (0..len).map(|x| TileCoord::new(x, 0)).collect()
    }

    #[test]
    fn test_advance_snaps_to_tiles() {
        let path = row(4);
        let mut unit = BattleUnit::new(
            UnitId(1),
            PlayerId::new("p"),
            CardId::new("militia"),
            &stats(1.0),
            path.clone(),
            path[3],
        );

        unit.advance(0.5);
        assert_eq!(unit.tile(), path[0]);
        let (x, _) = unit.position();
        assert!((x - 0.5).abs() < 1e-5);

        unit.advance(0.5);
        assert_eq!(unit.tile(), path[1]);
        assert!(unit.progress.abs() < 1e-5);
    }

    #[test]
    fn test_fast_unit_crosses_several_tiles_per_tick() {
        let path = row(6);
        let mut unit = BattleUnit::new(
            UnitId(1),
            PlayerId::new("p"),
            CardId::new("knight"),
            &stats(2.5),
            path.clone(),
            path[5],
        );
        unit.advance(1.0);
        assert_eq!(unit.path_index, 2);
        unit.advance(10.0);
        assert!(unit.is_at_end());
        assert_eq!(unit.tile(), path[5]);
        assert_eq!(unit.progress, 0.0);
    }

    #[test]
    fn test_single_tile_path_is_already_at_end() {
        let tile = TileCoord::new(3, 3);
        let unit = BattleUnit::new(
            UnitId(1),
            PlayerId::new("p"),
            CardId::new("militia"),
            &stats(1.0),
            vec![tile],
            tile,
        );
        assert!(unit.is_at_end());
        assert_eq!(unit.position(), (3.0, 3.0));
    }
}
