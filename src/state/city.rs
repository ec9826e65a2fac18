//! Cities - the territory anchors every player builds

use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::types::PlayerId;
use crate::hex::TileCoord;

/// City type. A player's first city is always the capital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CityType {
    Capital,
    Base,
    Fortified,
}

impl CityType {
    /// Territory influence radius in rings
    pub fn radius(&self, config: &GameConfig) -> u32 {
        match self {
            CityType::Capital => config.capital_radius,
            CityType::Base => config.base_radius,
            CityType::Fortified => config.fortified_radius,
        }
    }

    pub fn max_health(&self, config: &GameConfig) -> u32 {
        match self {
            CityType::Capital => config.capital_health,
            CityType::Base => config.base_health,
            CityType::Fortified => config.fortified_health,
        }
    }

    /// Production per level per turn
    pub fn income(&self, config: &GameConfig) -> u32 {
        match self {
            CityType::Capital => config.capital_income,
            CityType::Base => config.base_income,
            CityType::Fortified => config.fortified_income,
        }
    }
}

/// A built city. Never removed once built; at zero health it is razed instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub tile: TileCoord,
    pub level: u32,
    pub city_type: CityType,
    pub radius: u32,
    pub owner: PlayerId,
    pub health: u32,
    pub max_health: u32,
    pub razed: bool,
    /// Set once the territory engine has grown this city's rings
    #[serde(skip)]
    pub expanded: bool,
}

impl City {
    pub fn new(owner: PlayerId, tile: TileCoord, city_type: CityType, config: &GameConfig) -> Self {
        let max_health = city_type.max_health(config);
        Self {
            tile,
            level: 1,
            city_type,
            radius: city_type.radius(config),
            owner,
            health: max_health,
            max_health,
            razed: false,
            expanded: false,
        }
    }

    pub fn is_capital(&self) -> bool {
        self.city_type == CityType::Capital
    }

    /// Subtract damage (floored at 0). Returns true when this hit razed the city.
    pub fn apply_damage(&mut self, damage: u32) -> bool {
        if self.razed {
            return false;
        }
        self.health = self.health.saturating_sub(damage);
        if self.health == 0 {
            self.razed = true;
            return true;
        }
        false
    }

    /// Production collected at the start of a turn; razed cities yield nothing
    pub fn income(&self, config: &GameConfig) -> u32 {
        if self.razed {
            0
        } else {
            self.city_type.income(config) * self.level
        }
    }
}
