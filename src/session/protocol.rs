//! Wire protocol - JSON messages tagged by `type`, camelCase fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::battle::{BattleTally, TowerShot, UnitSnapshot};
use crate::core::types::{CardId, PlayerColor, PlayerId, SessionId, StructureId, Tick, UnitId};
use crate::engine::TileClaim;
use crate::hex::{TileCoord, TileType};
use crate::state::{BattlePlan, City, CityType, Phase, Resources, Structure, TurnStep};

/// Player to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinSession {
        session_id: SessionId,
        player_id: PlayerId,
        display_name: String,
    },
    StartMatch {
        session_id: SessionId,
        #[serde(default)]
        map_data: Option<Vec<Vec<TileType>>>,
        #[serde(default)]
        match_id: Option<String>,
    },
    BuildCity {
        session_id: SessionId,
        player_id: PlayerId,
        tile: TileCoord,
        #[serde(default)]
        city_type: Option<CityType>,
    },
    BuildStructure {
        session_id: SessionId,
        player_id: PlayerId,
        structure: CardId,
        tile: TileCoord,
    },
    BuyCard {
        session_id: SessionId,
        player_id: PlayerId,
        card: CardId,
    },
    QueueArmy {
        session_id: SessionId,
        player_id: PlayerId,
        selected_cards: Vec<CardId>,
    },
    SelectTarget {
        session_id: SessionId,
        player_id: PlayerId,
        source_city: TileCoord,
        target_city: TileCoord,
    },
    Ready {
        session_id: SessionId,
        player_id: PlayerId,
        step: TurnStep,
    },
}

impl ClientMessage {
    pub fn session_id(&self) -> &SessionId {
        match self {
            ClientMessage::JoinSession { session_id, .. }
            | ClientMessage::StartMatch { session_id, .. }
            | ClientMessage::BuildCity { session_id, .. }
            | ClientMessage::BuildStructure { session_id, .. }
            | ClientMessage::BuyCard { session_id, .. }
            | ClientMessage::QueueArmy { session_id, .. }
            | ClientMessage::SelectTarget { session_id, .. }
            | ClientMessage::Ready { session_id, .. } => session_id,
        }
    }

    /// Acting player, for player-scoped actions
    pub fn player_id(&self) -> Option<&PlayerId> {
        match self {
            ClientMessage::StartMatch { .. } => None,
            ClientMessage::JoinSession { player_id, .. }
            | ClientMessage::BuildCity { player_id, .. }
            | ClientMessage::BuildStructure { player_id, .. }
            | ClientMessage::BuyCard { player_id, .. }
            | ClientMessage::QueueArmy { player_id, .. }
            | ClientMessage::SelectTarget { player_id, .. }
            | ClientMessage::Ready { player_id, .. } => Some(player_id),
        }
    }

    /// Wire name, used in rejections and logs
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::JoinSession { .. } => "joinSession",
            ClientMessage::StartMatch { .. } => "startMatch",
            ClientMessage::BuildCity { .. } => "buildCity",
            ClientMessage::BuildStructure { .. } => "buildStructure",
            ClientMessage::BuyCard { .. } => "buyCard",
            ClientMessage::QueueArmy { .. } => "queueArmy",
            ClientMessage::SelectTarget { .. } => "selectTarget",
            ClientMessage::Ready { .. } => "ready",
        }
    }
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub display_name: String,
    pub color: PlayerColor,
    pub connected: bool,
    pub ready: bool,
    pub city_count: usize,
}

/// Server to player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Roster and readiness
    SessionUpdate {
        session_id: SessionId,
        turn_number: u32,
        turn_step: TurnStep,
        phase: Phase,
        players: Vec<PlayerSummary>,
    },
    /// Full state for one player, sent on join, reconnect and match start
    SessionSnapshot {
        session_id: SessionId,
        player_id: PlayerId,
        match_id: Option<String>,
        map: Option<Vec<Vec<TileType>>>,
        turn_number: u32,
        turn_step: TurnStep,
        phase: Phase,
        players: Vec<PlayerSummary>,
        territories: BTreeMap<PlayerId, Vec<TileCoord>>,
        cities: Vec<City>,
        structures: Vec<Structure>,
        resources: Resources,
        hand: Vec<CardId>,
        inventory: Vec<CardId>,
        queued_army: Vec<CardId>,
        battle_plan: Option<BattlePlan>,
    },
    PhaseChanged {
        turn_number: u32,
        turn_step: TurnStep,
        phase: Phase,
    },
    /// Incremental ownership; ring 0 is a city's own tile
    TerritoryClaims {
        claims: Vec<TileClaim>,
        ring: u32,
        max_ring: u32,
    },
    ExpansionComplete {
        turn_number: u32,
    },
    CityBuilt {
        player_id: PlayerId,
        city: City,
    },
    CityBuildFailed {
        tile: TileCoord,
        reason: String,
    },
    StructureBuilt {
        player_id: PlayerId,
        structure: Structure,
    },
    StructureBuildFailed {
        tile: TileCoord,
        reason: String,
    },
    InventoryUpdate {
        hand: Vec<CardId>,
        inventory: Vec<CardId>,
    },
    ArmyQueued {
        player_id: PlayerId,
        cards: Vec<CardId>,
    },
    BattlePlanSet {
        player_id: PlayerId,
        plan: BattlePlan,
    },
    BattleStarted {
        player_id: PlayerId,
        target_city: TileCoord,
        path: Vec<TileCoord>,
        units: Vec<UnitSnapshot>,
    },
    /// Every unit in flight plus the structure fire of this tick
    BattleTick {
        tick: Tick,
        units: Vec<UnitSnapshot>,
        tower_fire: Vec<TowerShot>,
    },
    UnitReachedTarget {
        unit_id: UnitId,
        player_id: PlayerId,
        target_city: TileCoord,
        city_damage: u32,
    },
    CityDamaged {
        owner: PlayerId,
        tile: TileCoord,
        health: u32,
        razed: bool,
    },
    StructureDestroyed {
        structure_id: StructureId,
        owner: PlayerId,
        tile: TileCoord,
    },
    BattleFinished {
        player_id: PlayerId,
        tally: BattleTally,
    },
    ResourceUpdate {
        resources: Resources,
    },
    HandDealt {
        hand: Vec<CardId>,
    },
    PlayerRemoved {
        player_id: PlayerId,
    },
    /// A validation failure, sent only to the originating connection
    ActionRejected {
        action: String,
        reason: String,
    },
}
