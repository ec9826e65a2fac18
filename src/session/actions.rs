//! Player turn actions
//!
//! Every action is legal in exactly one step and validates fully before it
//! mutates anything.

use crate::core::error::{GameError, Result};
use crate::core::types::{CardId, PlayerId};
use crate::engine::{self, TileClaim};
use crate::hex::{MapGrid, TileCoord, TileType};
use crate::session::{ServerMessage, Session};
use crate::state::{BattlePlan, CityType, TurnStep};

impl Session {
    fn require_step(&self, action: &'static str, step: TurnStep) -> Result<()> {
        if !self.state.is_started() {
            return Err(GameError::MatchNotStarted);
        }
        if self.state.turn_step != step {
            return Err(GameError::WrongStep {
                action,
                step: self.state.turn_step,
            });
        }
        Ok(())
    }

    /// Seed the map and deal opening hands
    pub fn start_match(
        &mut self,
        map_data: Option<Vec<Vec<TileType>>>,
        match_id: Option<String>,
    ) -> Result<()> {
        if self.state.is_started() {
            return Err(GameError::MatchAlreadyStarted);
        }
        let rows = map_data.ok_or(GameError::NoMap)?;
        let map = MapGrid::from_rows(rows)?;

        tracing::info!(
            "Session {}: match {:?} started on a {}x{} map with {} players",
            self.state.id,
            match_id,
            map.width(),
            map.height(),
            self.state.players.len()
        );
        self.state.map = Some(map);
        self.state.match_id = match_id;
        self.state.turn_number = 1;
        self.state.turn_step = TurnStep::BuildCity;
        self.state.clear_readiness();

        let players: Vec<PlayerId> = self.state.players.keys().cloned().collect();
        for player_id in &players {
            self.deal_hand(player_id);
        }
        for player_id in &players {
            self.send_snapshot(player_id);
        }
        self.broadcast(self.phase_changed());
        self.broadcast_session_update();
        Ok(())
    }

    /// Step 0: found a city. The first is always the capital.
    pub fn build_city(
        &mut self,
        player_id: &PlayerId,
        tile: TileCoord,
        city_type: Option<CityType>,
    ) -> Result<()> {
        self.require_step("buildCity", TurnStep::BuildCity)?;
        let requested = city_type.unwrap_or(CityType::Base);
        let newly_claimed = self.state.owner_of(tile).is_none();
        let city = engine::place_city(&mut self.state, tile, player_id, requested, &self.config)?;

        self.broadcast(ServerMessage::CityBuilt {
            player_id: player_id.clone(),
            city,
        });
        // Later cities sit on tiles the player already owns
        if newly_claimed {
            self.broadcast(ServerMessage::TerritoryClaims {
                claims: vec![TileClaim {
                    player_id: player_id.clone(),
                    tile,
                }],
                ring: 0,
                max_ring: self.config.max_expansion_rings,
            });
        }
        self.send_resources(player_id);
        Ok(())
    }

    /// Step 1: buy a card from the hand into the inventory
    pub fn buy_card(&mut self, player_id: &PlayerId, card_id: &CardId) -> Result<()> {
        self.require_step("buyCard", TurnStep::BuyCards)?;
        let card = self
            .catalog
            .lookup(card_id)
            .ok_or_else(|| GameError::UnknownCard(card_id.clone()))?;
        let player = self
            .state
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        let slot = player
            .hand
            .iter()
            .position(|c| c == card_id)
            .ok_or_else(|| GameError::CardNotInHand(card_id.clone()))?;
        player.resources.check_gold(card.cost)?;

        player.resources.gold -= card.cost;
        player.hand.remove(slot);
        player.inventory.add(card_id.clone());
        tracing::debug!("Session {}: {} bought {}", self.state.id, player_id, card_id);

        self.send_inventory(player_id);
        self.send_resources(player_id);
        Ok(())
    }

    /// Step 3: place a defensive structure from the inventory
    pub fn build_structure(
        &mut self,
        player_id: &PlayerId,
        card_id: &CardId,
        tile: TileCoord,
    ) -> Result<()> {
        self.require_step("buildStructure", TurnStep::PlaceStructures)?;
        let card = self
            .catalog
            .lookup(card_id)
            .ok_or_else(|| GameError::UnknownCard(card_id.clone()))?;
        let structure =
            engine::place_structure(&mut self.state, tile, player_id, &card, &self.config)?;

        self.broadcast(ServerMessage::StructureBuilt {
            player_id: player_id.clone(),
            structure,
        });
        self.send_inventory(player_id);
        self.send_resources(player_id);
        Ok(())
    }

    /// Step 4: choose the attacking army
    ///
    /// Replaces any earlier selection this step; the previous queue goes back
    /// to the inventory first. An empty selection just clears the queue.
    pub fn queue_army(&mut self, player_id: &PlayerId, selected: Vec<CardId>) -> Result<()> {
        self.require_step("queueArmy", TurnStep::QueueArmy)?;
        let player = self
            .state
            .players
            .get(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;

        let cap = player.army_cap(&self.config);
        if selected.len() > cap {
            return Err(GameError::ArmyTooLarge {
                requested: selected.len(),
                cap,
            });
        }

        let mut inventory = player.inventory.clone();
        for card in &player.queued_army {
            inventory.add(card.clone());
        }
        for card_id in &selected {
            let card = self
                .catalog
                .lookup(card_id)
                .ok_or_else(|| GameError::UnknownCard(card_id.clone()))?;
            if !card.is_unit() {
                return Err(GameError::WrongCardKind(card_id.clone()));
            }
            if !inventory.remove(card_id) {
                return Err(GameError::CardNotInInventory(card_id.clone()));
            }
        }

        let player = self
            .state
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        player.inventory = inventory;
        player.queued_army = selected.clone();
        if player.queued_army.is_empty() {
            player.battle_plan = None;
        }

        self.send_to(
            player_id,
            ServerMessage::ArmyQueued {
                player_id: player_id.clone(),
                cards: selected,
            },
        );
        self.send_inventory(player_id);
        Ok(())
    }

    /// Step 5: pick the city to attack from and the enemy city to attack
    pub fn select_target(
        &mut self,
        player_id: &PlayerId,
        source: TileCoord,
        target: TileCoord,
    ) -> Result<()> {
        self.require_step("selectTarget", TurnStep::SelectTarget)?;
        let player = self
            .state
            .players
            .get(player_id)
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        if player.queued_army.is_empty() {
            return Err(GameError::NoArmyQueued);
        }
        if player.city_at(source).is_none() {
            return Err(GameError::NotYourCity(source));
        }

        let target_city = self
            .state
            .city_at(target)
            .filter(|c| &c.owner != player_id)
            .ok_or(GameError::NoEnemyCity(target))?;
        if target_city.razed {
            return Err(GameError::CityRazed(target));
        }

        let path = engine::find_path(&self.state, source, target, player_id).ok_or(
            GameError::NoPath {
                from: source,
                to: target,
            },
        )?;

        let plan = BattlePlan {
            source_city: source,
            target_city: target,
            path,
        };
        if let Some(player) = self.state.players.get_mut(player_id) {
            player.battle_plan = Some(plan.clone());
        }
        tracing::debug!(
            "Session {}: {} targets {} from {} ({} tiles)",
            self.state.id,
            player_id,
            target,
            source,
            plan.path.len()
        );

        self.broadcast(ServerMessage::BattlePlanSet {
            player_id: player_id.clone(),
            plan,
        });
        Ok(())
    }
}
