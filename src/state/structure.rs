//! Defensive structures placed from cards

use serde::{Deserialize, Serialize};

use crate::cards::CardDef;
use crate::core::types::{CardId, PlayerId, StructureId};
use crate::hex::TileCoord;

/// A placed defensive structure with card-derived combat stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: StructureId,
    pub owner: PlayerId,
    pub tile: TileCoord,
    pub card_id: CardId,
    pub health: f32,
    pub max_health: f32,
    pub damage: f32,
    pub range: u32,
    /// Seconds between shots
    pub attack_interval: f32,
    /// Seconds until the next shot; fires when <= 0
    pub cooldown: f32,
    pub reusable: bool,
}

impl Structure {
    /// Build from a defensive card; `None` for unit cards
    pub fn from_card(id: StructureId, owner: PlayerId, tile: TileCoord, card: &CardDef) -> Option<Self> {
        let stats = card.structure_stats()?;
        Some(Self {
            id,
            owner,
            tile,
            card_id: card.id.clone(),
            health: stats.health,
            max_health: stats.health,
            damage: stats.damage,
            range: stats.range,
            attack_interval: stats.attack_interval,
            cooldown: 0.0,
            reusable: card.reusable,
        })
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    /// Structures with no damage never fire
    pub fn is_armed(&self) -> bool {
        self.damage > 0.0
    }
}
