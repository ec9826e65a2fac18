//! Placement rules for cities and defensive structures
//!
//! `can_place_*` only inspect state. `place_*` validate everything first and
//! then mutate, so a rejected placement never leaves a partial deduction.

use crate::cards::CardDef;
use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::PlayerId;
use crate::hex::TileCoord;
use crate::state::{City, CityType, Player, SessionState, Structure};

fn player<'a>(state: &'a SessionState, player_id: &PlayerId) -> Result<&'a Player> {
    state
        .players
        .get(player_id)
        .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))
}

/// Tile must be on the map, passable and free of cities and structures
fn check_free_tile(state: &SessionState, tile: TileCoord) -> Result<()> {
    let map = state.map()?;
    if !map.is_valid_tile(tile) {
        return Err(GameError::InvalidTile(tile));
    }
    if state.is_occupied(tile) {
        return Err(GameError::TileOccupied(tile));
    }
    Ok(())
}

fn check_own_territory(state: &SessionState, tile: TileCoord, player_id: &PlayerId) -> Result<()> {
    if state.owner_of(tile) != Some(player_id) {
        return Err(GameError::OutsideTerritory(tile));
    }
    Ok(())
}

/// Can `player_id` build a city on `tile` right now?
///
/// The first city may go on any free grass tile nobody else owns; every later
/// city must sit inside the player's own territory.
pub fn can_place_city(
    state: &SessionState,
    tile: TileCoord,
    player_id: &PlayerId,
    config: &GameConfig,
) -> Result<()> {
    let player = player(state, player_id)?;
    check_free_tile(state, tile)?;

    if player.cities.is_empty() {
        if let Some(owner) = state.owner_of(tile) {
            if owner != player_id {
                return Err(GameError::TileOwnedByOther(tile));
            }
        }
    } else {
        check_own_territory(state, tile, player_id)?;
    }

    player.resources.check_production(config.city_cost)
}

/// Can `player_id` put a structure on `tile` right now?
pub fn can_place_structure(
    state: &SessionState,
    tile: TileCoord,
    player_id: &PlayerId,
    config: &GameConfig,
) -> Result<()> {
    let player = player(state, player_id)?;
    check_free_tile(state, tile)?;
    check_own_territory(state, tile, player_id)?;
    player.resources.check_production(config.structure_cost)
}

/// Validate, charge and build a city. The first city is always the capital;
/// a requested capital after that is built as a base.
pub fn place_city(
    state: &mut SessionState,
    tile: TileCoord,
    player_id: &PlayerId,
    requested: CityType,
    config: &GameConfig,
) -> Result<City> {
    can_place_city(state, tile, player_id, config)?;

    let player = state
        .players
        .get_mut(player_id)
        .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;

    let city_type = match (player.cities.is_empty(), requested) {
        (true, _) => CityType::Capital,
        (false, CityType::Capital) => CityType::Base,
        (false, other) => other,
    };

    player.resources.production -= config.city_cost;
    let city = City::new(player_id.clone(), tile, city_type, config);
    player.cities.push(city.clone());
    state.claim_tile(tile, player_id);

    tracing::info!(
        "Session {}: {} built {:?} at {}",
        state.id,
        player_id,
        city_type,
        tile
    );
    Ok(city)
}

/// Validate, charge and build a structure from a defensive card in inventory
pub fn place_structure(
    state: &mut SessionState,
    tile: TileCoord,
    player_id: &PlayerId,
    card: &CardDef,
    config: &GameConfig,
) -> Result<Structure> {
    if !card.is_defensive() {
        return Err(GameError::WrongCardKind(card.id.clone()));
    }
    if !player(state, player_id)?.inventory.contains(&card.id) {
        return Err(GameError::CardNotInInventory(card.id.clone()));
    }
    can_place_structure(state, tile, player_id, config)?;

    let id = state.allocate_structure_id();
    let structure = Structure::from_card(id, player_id.clone(), tile, card)
        .ok_or_else(|| GameError::WrongCardKind(card.id.clone()))?;

    let player = state
        .players
        .get_mut(player_id)
        .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
    player.resources.production -= config.structure_cost;
    player.inventory.remove(&card.id);
    state.structures.push(structure.clone());

    tracing::info!(
        "Session {}: {} placed {} at {}",
        state.id,
        player_id,
        card.id,
        tile
    );
    Ok(structure)
}
