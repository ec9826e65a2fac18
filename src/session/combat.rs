//! Battle orchestration - spawning attacks, driving the shared tick clock and
//! applying what each tick produced to cities, structures and inventories

use crate::battle::{self, Arrival, BattleUnit, UnitSnapshot};
use crate::core::types::PlayerId;
use crate::session::{ServerMessage, Session, TimerKey};
use crate::state::{Structure, TurnStep};

impl Session {
    /// Launch an attack for every connected player with a plan and an army
    pub(crate) fn begin_battles(&mut self) {
        let attackers: Vec<PlayerId> = self
            .state
            .connected_players()
            .filter(|p| p.battle_plan.is_some() && !p.queued_army.is_empty())
            .map(|p| p.id.clone())
            .collect();

        self.state.battle_ticks = 0;
        for player_id in attackers {
            let spawned = battle::spawn_army(&mut self.state, &player_id, self.catalog.as_ref());
            if spawned == 0 {
                continue;
            }
            let Some(plan) = self
                .state
                .players
                .get(&player_id)
                .and_then(|p| p.battle_plan.clone())
            else {
                continue;
            };

            self.state
                .battles_outstanding
                .insert(player_id.clone(), Default::default());
            tracing::info!(
                "Session {}: {} attacks {} with {} units",
                self.state.id,
                player_id,
                plan.target_city,
                spawned
            );
            let units = snapshots(self.state.battle_units.iter().filter(|u| u.owner == player_id));
            self.broadcast(ServerMessage::BattleStarted {
                player_id,
                target_city: plan.target_city,
                path: plan.path,
                units,
            });
        }

        if !self.state.battles_outstanding.is_empty() {
            let turn = self.state.turn_number;
            self.schedule(TimerKey::BattleTick { turn }, self.config.battle_tick());
        }
    }

    pub(crate) fn on_battle_tick(&mut self, turn: u32) {
        if turn != self.state.turn_number
            || self.state.turn_step != TurnStep::Battle
            || self.state.battles_outstanding.is_empty()
        {
            return;
        }

        self.state.battle_ticks += 1;
        let tick = self.state.battle_ticks;
        let outcome = battle::step(
            &mut self.state.battle_units,
            &mut self.state.structures,
            self.config.tick_seconds(),
        );

        self.broadcast(ServerMessage::BattleTick {
            tick,
            units: snapshots(self.state.battle_units.iter()),
            tower_fire: outcome.shots,
        });

        for casualty in &outcome.casualties {
            if let Some(tally) = self.state.battles_outstanding.get_mut(&casualty.owner) {
                tally.lost += 1;
            }
        }
        for structure in outcome.destroyed {
            self.structure_destroyed(structure);
        }
        for arrival in &outcome.arrivals {
            self.unit_arrived(arrival);
        }

        if tick >= self.config.max_battle_ticks && !self.state.battle_units.is_empty() {
            tracing::warn!(
                "Session {}: battle hit the {} tick cap, clearing {} units",
                self.state.id,
                tick,
                self.state.battle_units.len()
            );
            self.state.battle_units.clear();
        }

        let finished: Vec<PlayerId> = self
            .state
            .battles_outstanding
            .keys()
            .filter(|p| !self.state.battle_units.iter().any(|u| &u.owner == *p))
            .cloned()
            .collect();
        for player_id in finished {
            self.finish_battle(&player_id);
        }

        if self.state.battles_outstanding.is_empty() {
            self.broadcast_session_update();
            self.advance_if_all_ready();
        } else {
            self.schedule(TimerKey::BattleTick { turn }, self.config.battle_tick());
        }
    }

    fn structure_destroyed(&mut self, structure: Structure) {
        tracing::debug!(
            "Session {}: {}'s {} at {} destroyed",
            self.state.id,
            structure.owner,
            structure.card_id,
            structure.tile
        );
        if structure.reusable {
            if let Some(owner) = self.state.players.get_mut(&structure.owner) {
                owner.inventory.add(structure.card_id.clone());
            }
            self.send_inventory(&structure.owner);
        }
        self.broadcast(ServerMessage::StructureDestroyed {
            structure_id: structure.id,
            owner: structure.owner,
            tile: structure.tile,
        });
    }

    /// A unit reached its target: damage the city there
    fn unit_arrived(&mut self, arrival: &Arrival) {
        if let Some(tally) = self.state.battles_outstanding.get_mut(&arrival.owner) {
            tally.reached += 1;
        }
        self.broadcast(ServerMessage::UnitReachedTarget {
            unit_id: arrival.unit_id,
            player_id: arrival.owner.clone(),
            target_city: arrival.target_city,
            city_damage: arrival.city_damage,
        });

        let hit = self
            .state
            .players
            .values_mut()
            .filter(|p| p.id != arrival.owner)
            .find_map(|p| p.city_at_mut(arrival.target_city));
        let Some(city) = hit else {
            tracing::debug!(
                "Session {}: {}'s target {} is gone",
                self.state.id,
                arrival.owner,
                arrival.target_city
            );
            return;
        };
        let razed_now = city.apply_damage(arrival.city_damage);
        if let Some(tally) = self.state.battles_outstanding.get_mut(&arrival.owner) {
            tally.city_damage += arrival.city_damage;
        }
        let damaged = ServerMessage::CityDamaged {
            owner: city.owner.clone(),
            tile: city.tile,
            health: city.health,
            razed: city.razed,
        };
        if razed_now {
            tracing::info!(
                "Session {}: {}'s {:?} at {} razed by {}",
                self.state.id,
                city.owner,
                city.city_type,
                city.tile,
                arrival.owner
            );
        }
        self.broadcast(damaged);
    }

    fn finish_battle(&mut self, player_id: &PlayerId) {
        let Some(tally) = self.state.battles_outstanding.remove(player_id) else {
            return;
        };
        if let Some(player) = self.state.players.get_mut(player_id) {
            player.ready = true;
        }
        tracing::info!(
            "Session {}: {}'s attack finished: {} reached, {} lost",
            self.state.id,
            player_id,
            tally.reached,
            tally.lost
        );
        self.broadcast(ServerMessage::BattleFinished {
            player_id: player_id.clone(),
            tally,
        });
    }
}

fn snapshots<'a>(units: impl Iterator<Item = &'a BattleUnit>) -> Vec<UnitSnapshot> {
    units.map(BattleUnit::snapshot).collect()
}
