//! Per-match session state
//!
//! Everything one match mutates lives here. The engines (territory, placement,
//! pathfinding, battle) operate on this struct; the session actor is its only
//! owner, so none of it is synchronized.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::battle::{BattleTally, BattleUnit};
use crate::core::error::{GameError, Result};
use crate::core::types::{PlayerId, SessionId, StructureId, Tick, UnitId};
use crate::engine::territory::ExpansionState;
use crate::hex::{MapGrid, TileCoord};
use crate::state::city::City;
use crate::state::player::Player;
use crate::state::structure::Structure;

/// The seven ordered steps of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TurnStep {
    #[default]
    BuildCity,
    BuyCards,
    ExpandTerritory,
    PlaceStructures,
    QueueArmy,
    SelectTarget,
    Battle,
}

impl TurnStep {
    pub fn index(&self) -> u8 {
        match self {
            TurnStep::BuildCity => 0,
            TurnStep::BuyCards => 1,
            TurnStep::ExpandTerritory => 2,
            TurnStep::PlaceStructures => 3,
            TurnStep::QueueArmy => 4,
            TurnStep::SelectTarget => 5,
            TurnStep::Battle => 6,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(TurnStep::BuildCity),
            1 => Some(TurnStep::BuyCards),
            2 => Some(TurnStep::ExpandTerritory),
            3 => Some(TurnStep::PlaceStructures),
            4 => Some(TurnStep::QueueArmy),
            5 => Some(TurnStep::SelectTarget),
            6 => Some(TurnStep::Battle),
            _ => None,
        }
    }

    /// Following step; `None` after Battle (the turn wraps via a new turn)
    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn phase(&self) -> Phase {
        if self.index() <= TurnStep::PlaceStructures.index() {
            Phase::Expand
        } else {
            Phase::Conquer
        }
    }
}

impl fmt::Display for TurnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<TurnStep> for u8 {
    fn from(step: TurnStep) -> Self {
        step.index()
    }
}

impl TryFrom<u8> for TurnStep {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        TurnStep::from_index(value).ok_or_else(|| format!("invalid turn step {}", value))
    }
}

/// Coarse phase derived from the turn step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Expand,
    Conquer,
}

/// Complete state of one match
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: SessionId,
    pub match_id: Option<String>,
    /// `None` until the match starts
    pub map: Option<MapGrid>,
    pub tile_ownership: AHashMap<TileCoord, PlayerId>,
    pub territories: BTreeMap<PlayerId, Vec<TileCoord>>,
    pub players: BTreeMap<PlayerId, Player>,
    pub structures: Vec<Structure>,
    pub battle_units: Vec<BattleUnit>,

    // Turn machine
    pub turn_step: TurnStep,
    pub turn_number: u32,
    /// Reentrancy guard for turn advancement
    pub advancing: bool,
    /// Set for a short window after a new turn starts
    pub suppress_auto_advance: bool,

    // In-flight phase work
    pub expansion: Option<ExpansionState>,
    /// Players whose attack is still simulating, with their running tally
    pub battles_outstanding: BTreeMap<PlayerId, BattleTally>,
    pub battle_ticks: Tick,

    next_unit_id: u32,
    next_structure_id: u32,
}

impl SessionState {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            match_id: None,
            map: None,
            tile_ownership: AHashMap::new(),
            territories: BTreeMap::new(),
            players: BTreeMap::new(),
            structures: Vec::new(),
            battle_units: Vec::new(),
            turn_step: TurnStep::BuildCity,
            turn_number: 0,
            advancing: false,
            suppress_auto_advance: false,
            expansion: None,
            battles_outstanding: BTreeMap::new(),
            battle_ticks: 0,
            next_unit_id: 0,
            next_structure_id: 0,
        }
    }

    pub fn is_started(&self) -> bool {
        self.map.is_some()
    }

    pub fn map(&self) -> Result<&MapGrid> {
        self.map.as_ref().ok_or(GameError::MatchNotStarted)
    }

    pub fn phase(&self) -> Phase {
        self.turn_step.phase()
    }

    // === Ownership ===

    pub fn owner_of(&self, tile: TileCoord) -> Option<&PlayerId> {
        self.tile_ownership.get(&tile)
    }

    /// Claim an unowned tile. Returns false if anyone already owns it.
    pub fn claim_tile(&mut self, tile: TileCoord, player: &PlayerId) -> bool {
        if self.tile_ownership.contains_key(&tile) {
            return false;
        }
        self.tile_ownership.insert(tile, player.clone());
        self.territories.entry(player.clone()).or_default().push(tile);
        true
    }

    pub fn territory_of(&self, player: &PlayerId) -> &[TileCoord] {
        self.territories.get(player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop every tile a player owns
    pub fn release_territory(&mut self, player: &PlayerId) {
        if let Some(tiles) = self.territories.remove(player) {
            for tile in tiles {
                self.tile_ownership.remove(&tile);
            }
        }
    }

    // === Occupancy ===

    pub fn city_at(&self, tile: TileCoord) -> Option<&City> {
        self.players.values().find_map(|p| p.city_at(tile))
    }

    pub fn structure_at(&self, tile: TileCoord) -> Option<&Structure> {
        self.structures.iter().find(|s| s.tile == tile)
    }

    /// A city or structure already stands on this tile
    pub fn is_occupied(&self, tile: TileCoord) -> bool {
        self.city_at(tile).is_some() || self.structure_at(tile).is_some()
    }

    // === Players ===

    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_connected())
    }

    /// True when at least one player is connected and every connected player is ready
    pub fn all_connected_ready(&self) -> bool {
        let mut any = false;
        for player in self.connected_players() {
            if !player.ready {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn clear_readiness(&mut self) {
        for player in self.players.values_mut() {
            player.ready = false;
        }
    }

    // === Id allocation ===

    pub fn allocate_unit_id(&mut self) -> UnitId {
        self.next_unit_id += 1;
        UnitId(self.next_unit_id)
    }

    pub fn allocate_structure_id(&mut self) -> StructureId {
        self.next_structure_id += 1;
        StructureId(self.next_structure_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_sequence() {
        let mut step = TurnStep::BuildCity;
        let mut seen = vec![step];
        while let Some(next) = step.next() {
            seen.push(next);
            step = next;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(step, TurnStep::Battle);
    }

    #[test]
    fn test_phase_split() {
        assert_eq!(TurnStep::ExpandTerritory.phase(), Phase::Expand);
        assert_eq!(TurnStep::PlaceStructures.phase(), Phase::Expand);
        assert_eq!(TurnStep::QueueArmy.phase(), Phase::Conquer);
        assert_eq!(TurnStep::Battle.phase(), Phase::Conquer);
    }

    #[test]
    fn test_step_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&TurnStep::SelectTarget).unwrap(), "5");
        let step: TurnStep = serde_json::from_str("2").unwrap();
        assert_eq!(step, TurnStep::ExpandTerritory);
        assert!(serde_json::from_str::<TurnStep>("9").is_err());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut state = SessionState::new(SessionId::new("s"));
        let a = PlayerId::new("a");
        let b = PlayerId::new("b");
        let tile = TileCoord::new(1, 1);

        assert!(state.claim_tile(tile, &a));
        assert!(!state.claim_tile(tile, &b));
        assert!(!state.claim_tile(tile, &a));
        assert_eq!(state.owner_of(tile), Some(&a));
        assert_eq!(state.territory_of(&a), &[tile]);
        assert!(state.territory_of(&b).is_empty());
    }

    #[test]
    fn test_release_territory() {
        let mut state = SessionState::new(SessionId::new("s"));
        let a = PlayerId::new("a");
        state.claim_tile(TileCoord::new(0, 0), &a);
        state.claim_tile(TileCoord::new(1, 0), &a);
        state.release_territory(&a);
        assert!(state.tile_ownership.is_empty());
        assert!(state.territory_of(&a).is_empty());
    }

    #[test]
    fn test_no_connected_players_is_not_ready() {
        let state = SessionState::new(SessionId::new("s"));
        assert!(!state.all_connected_ready());
    }
}
