//! Players - one per participant, owned by exactly one session

use serde::{Deserialize, Serialize};

use crate::cards::{DeckRuntime, Inventory};
use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{CardId, PlayerColor, PlayerId};
use crate::hex::TileCoord;
use crate::session::connection::Connection;
use crate::session::protocol::ServerMessage;
use crate::state::city::City;

/// Spendable resource pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub production: u32,
    pub gold: u32,
}

impl Resources {
    pub fn new(production: u32, gold: u32) -> Self {
        Self { production, gold }
    }

    pub fn starting(config: &GameConfig) -> Self {
        Self::new(config.starting_production, config.starting_gold)
    }

    pub fn check_production(&self, amount: u32) -> Result<()> {
        if self.production < amount {
            return Err(GameError::InsufficientResources {
                resource: "production",
                needed: amount,
                available: self.production,
            });
        }
        Ok(())
    }

    pub fn check_gold(&self, amount: u32) -> Result<()> {
        if self.gold < amount {
            return Err(GameError::InsufficientResources {
                resource: "gold",
                needed: amount,
                available: self.gold,
            });
        }
        Ok(())
    }
}

/// Chosen attack for the current turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlePlan {
    pub source_city: TileCoord,
    pub target_city: TileCoord,
    pub path: Vec<TileCoord>,
}

/// A participant in a session
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub color: PlayerColor,
    /// `None` while disconnected
    pub connection: Option<Connection>,
    pub resources: Resources,
    /// Build order; the first is the capital
    pub cities: Vec<City>,
    pub inventory: Inventory,
    pub hand: Vec<CardId>,
    pub deck: DeckRuntime,
    pub queued_army: Vec<CardId>,
    pub battle_plan: Option<BattlePlan>,
    pub ready: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        display_name: String,
        color: PlayerColor,
        deck: DeckRuntime,
        config: &GameConfig,
    ) -> Self {
        Self {
            id,
            display_name,
            color,
            connection: None,
            resources: Resources::starting(config),
            cities: Vec::new(),
            inventory: Inventory::new(),
            hand: Vec::new(),
            deck,
            queued_army: Vec::new(),
            battle_plan: None,
            ready: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn capital(&self) -> Option<&City> {
        self.cities.iter().find(|c| c.is_capital())
    }

    pub fn city_at(&self, tile: TileCoord) -> Option<&City> {
        self.cities.iter().find(|c| c.tile == tile)
    }

    pub fn city_at_mut(&mut self, tile: TileCoord) -> Option<&mut City> {
        self.cities.iter_mut().find(|c| c.tile == tile)
    }

    /// Maximum queued army size
    pub fn army_cap(&self, config: &GameConfig) -> usize {
        self.cities.len() * config.army_per_city
    }

    /// Send to this player's connection, if any
    pub fn send(&self, message: ServerMessage) {
        if let Some(connection) = &self.connection {
            connection.send(message);
        }
    }
}
