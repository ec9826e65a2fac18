//! Turn controller - the seven-step turn machine
//!
//! When every connected player is ready the session clears all readiness and
//! moves one step forward; after Battle a new turn starts. Advancement also
//! waits for a running expansion or battle, and is held back for a short
//! cooldown after each new turn so ready signals from the previous turn
//! cannot skip a step.

use crate::core::types::PlayerId;
use crate::engine;
use crate::session::{ServerMessage, Session, TimerKey};
use crate::state::{Player, TurnStep};

impl Session {
    /// Record `player_id` as ready for `step`. A signal for any step other
    /// than the current one is stale and ignored.
    pub fn submit_ready(&mut self, player_id: &PlayerId, step: TurnStep) {
        if !self.state.is_started() {
            tracing::debug!("Session {}: ready before match start ignored", self.state.id);
            return;
        }
        if step != self.state.turn_step {
            tracing::debug!(
                "Session {}: stale ready from {} for {} (now {})",
                self.state.id,
                player_id,
                step,
                self.state.turn_step
            );
            return;
        }
        let Some(player) = self.state.players.get_mut(player_id) else {
            return;
        };
        if player.ready {
            return;
        }
        player.ready = true;

        self.broadcast_session_update();
        self.advance_if_all_ready();
    }

    /// Advance one step if every connected player is ready. Returns true if
    /// the step changed.
    pub fn advance_if_all_ready(&mut self) -> bool {
        if !self.state.is_started() || self.state.advancing {
            return false;
        }
        if self.state.suppress_auto_advance {
            tracing::debug!("Session {}: advance deferred by new-turn cooldown", self.state.id);
            return false;
        }
        if self.state.expansion.is_some() || !self.state.battles_outstanding.is_empty() {
            return false;
        }
        if !self.state.all_connected_ready() {
            return false;
        }

        self.state.advancing = true;
        self.state.clear_readiness();
        match self.state.turn_step.next() {
            Some(step) => self.enter_step(step),
            None => self.start_new_turn(),
        }
        self.state.advancing = false;
        true
    }

    fn enter_step(&mut self, step: TurnStep) {
        self.state.turn_step = step;
        tracing::info!(
            "Session {}: turn {} step {} ({:?})",
            self.state.id,
            self.state.turn_number,
            step,
            step.phase()
        );
        self.broadcast(self.phase_changed());
        self.broadcast_session_update();

        match step {
            TurnStep::ExpandTerritory => self.begin_expansion(),
            TurnStep::PlaceStructures | TurnStep::QueueArmy | TurnStep::SelectTarget => {
                self.schedule_auto_ready(step)
            }
            TurnStep::Battle => {
                self.begin_battles();
                self.schedule_auto_ready(step);
            }
            TurnStep::BuildCity | TurnStep::BuyCards => {}
        }
    }

    /// Wrap up the turn: clear the battlefield, pay out, deal fresh hands
    pub fn start_new_turn(&mut self) {
        self.state.battle_units.clear();
        self.state.battles_outstanding.clear();
        self.state.battle_ticks = 0;
        for player in self.state.players.values_mut() {
            // An army that never marched goes back to the inventory
            for card in std::mem::take(&mut player.queued_army) {
                player.inventory.add(card);
            }
            player.battle_plan = None;
            player.ready = false;
        }

        self.state.turn_step = TurnStep::BuildCity;
        self.state.turn_number += 1;
        let turn = self.state.turn_number;

        let config = self.config.clone();
        for player in self.state.players.values_mut().filter(|p| p.is_connected()) {
            collect_resources(player, &config);
        }

        self.state.suppress_auto_advance = true;
        self.schedule(TimerKey::NewTurnCooldown { turn }, config.new_turn_cooldown());
        tracing::info!("Session {}: turn {} begins", self.state.id, turn);

        self.broadcast(self.phase_changed());
        let players: Vec<PlayerId> = self.state.players.keys().cloned().collect();
        for player_id in &players {
            self.send_resources(player_id);
        }
        for player_id in &players {
            self.deal_hand(player_id);
        }
        self.broadcast_session_update();
    }

    pub(crate) fn on_new_turn_cooldown(&mut self, turn: u32) {
        if turn != self.state.turn_number {
            return;
        }
        self.state.suppress_auto_advance = false;
        self.advance_if_all_ready();
    }

    fn schedule_auto_ready(&mut self, step: TurnStep) {
        let key = TimerKey::AutoReady {
            turn: self.state.turn_number,
            step,
        };
        self.schedule(key, self.config.auto_ready_delay());
    }

    /// Ready every connected player who has nothing to do this step
    pub(crate) fn on_auto_ready(&mut self, turn: u32, step: TurnStep) {
        if turn != self.state.turn_number || step != self.state.turn_step {
            return;
        }

        let idle: Vec<PlayerId> = self
            .state
            .connected_players()
            .filter(|p| !p.ready && !self.has_actionable(p, step))
            .map(|p| p.id.clone())
            .collect();
        if idle.is_empty() {
            return;
        }
        for player_id in &idle {
            if let Some(player) = self.state.players.get_mut(player_id) {
                player.ready = true;
            }
        }
        tracing::debug!(
            "Session {}: auto-ready {:?} at step {}",
            self.state.id,
            idle,
            step
        );
        self.broadcast_session_update();
        self.advance_if_all_ready();
    }

    fn has_actionable(&self, player: &Player, step: TurnStep) -> bool {
        let holds = |want_unit: bool| {
            player.inventory.card_ids().any(|id| {
                self.catalog
                    .lookup(id)
                    .map(|card| card.is_unit() == want_unit)
                    .unwrap_or(false)
            })
        };
        match step {
            TurnStep::PlaceStructures => holds(false),
            TurnStep::QueueArmy => holds(true) || !player.queued_army.is_empty(),
            TurnStep::SelectTarget => !player.queued_army.is_empty(),
            TurnStep::Battle => self.state.battles_outstanding.contains_key(&player.id),
            TurnStep::BuildCity | TurnStep::BuyCards | TurnStep::ExpandTerritory => true,
        }
    }

    // === Territory expansion ===

    fn begin_expansion(&mut self) {
        let expansion = engine::start_expansion(&mut self.state, self.config.max_expansion_rings);
        self.state.expansion = Some(expansion);
        let turn = self.state.turn_number;
        self.schedule(TimerKey::ExpansionRing { turn }, self.config.ring_delay());
    }

    pub(crate) fn on_expansion_ring(&mut self, turn: u32) {
        if turn != self.state.turn_number || self.state.turn_step != TurnStep::ExpandTerritory {
            return;
        }
        let Some(mut expansion) = self.state.expansion.take() else {
            return;
        };

        let outcome = engine::expand_ring(&mut self.state, &mut expansion);
        if !outcome.claims.is_empty() {
            self.broadcast(ServerMessage::TerritoryClaims {
                claims: outcome.claims,
                ring: outcome.ring,
                max_ring: outcome.max_ring,
            });
        }

        if !outcome.complete {
            self.state.expansion = Some(expansion);
            self.schedule(TimerKey::ExpansionRing { turn }, self.config.ring_delay());
            return;
        }

        tracing::info!(
            "Session {}: expansion complete after {} rings",
            self.state.id,
            outcome.ring
        );
        self.broadcast(ServerMessage::ExpansionComplete { turn_number: turn });
        // Nothing to decide during this step; it ends when growth does
        for player in self.state.players.values_mut().filter(|p| p.is_connected()) {
            player.ready = true;
        }
        self.broadcast_session_update();
        self.advance_if_all_ready();
    }
}

/// Turn income for one player: city production plus gold
fn collect_resources(player: &mut Player, config: &crate::core::config::GameConfig) {
    let production: u32 = player.cities.iter().map(|c| c.income(config)).sum();
    let standing = player.cities.iter().filter(|c| !c.razed).count() as u32;
    player.resources.production += production;
    player.resources.gold += config.gold_per_turn + config.gold_per_city * standing;
}
