//! Sessions - one authoritative actor per match
//!
//! `Session` holds a match's state and applies messages and timer firings to
//! it synchronously. It never awaits: timers are requested through
//! `drain_timer_requests` and scheduled by the actor (`actor.rs`), which is
//! the only thing that ever touches a `Session`. The registry routes inbound
//! messages to the right actor.

pub mod actions;
pub mod actor;
pub mod combat;
pub mod connection;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod timers;
pub mod turn;

pub use actor::{SessionCommand, SessionHandle};
pub use connection::Connection;
pub use protocol::{ClientMessage, PlayerSummary, ServerMessage};
pub use registry::SessionRegistry;
pub use timers::{TimerKey, TimerRequest, TimerSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::cards::{CardCatalog, DeckProvider};
use crate::core::config::GameConfig;
use crate::core::error::GameError;
use crate::core::types::{ConnectionId, PlayerId, SessionId};
use crate::state::SessionState;

/// One match: state plus the collaborators it needs
pub struct Session {
    pub state: SessionState,
    config: Arc<GameConfig>,
    catalog: Arc<dyn CardCatalog>,
    decks: Arc<dyn DeckProvider>,
    rng: ChaCha8Rng,
    timer_requests: Vec<TimerRequest>,
    closed: bool,
}

impl Session {
    pub fn new(
        id: SessionId,
        config: Arc<GameConfig>,
        catalog: Arc<dyn CardCatalog>,
        decks: Arc<dyn DeckProvider>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            state: SessionState::new(id),
            config,
            catalog,
            decks,
            rng,
            timer_requests: Vec::new(),
            closed: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.state.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// True once the last player has been removed; the actor then exits
    pub fn should_close(&self) -> bool {
        self.closed
    }

    /// Apply one player message
    ///
    /// Messages whose named player is unknown or bound to a different
    /// connection are stale and dropped with a log line.
    pub fn handle_message(&mut self, connection_id: ConnectionId, message: ClientMessage) {
        let action = message.name();
        let sender = match message.player_id() {
            Some(player_id) => {
                let bound = self
                    .state
                    .players
                    .get(player_id)
                    .and_then(|p| p.connection.as_ref())
                    .map(|c| c.id() == connection_id)
                    .unwrap_or(false);
                if !bound {
                    tracing::debug!(
                        "Session {}: dropping {} for {} from unbound connection {}",
                        self.state.id,
                        action,
                        player_id,
                        connection_id
                    );
                    return;
                }
                player_id.clone()
            }
            None => match self.player_for_connection(connection_id) {
                Some(player_id) => player_id,
                None => {
                    tracing::debug!(
                        "Session {}: dropping {} from unknown connection {}",
                        self.state.id,
                        action,
                        connection_id
                    );
                    return;
                }
            },
        };

        let result = match message {
            ClientMessage::JoinSession { .. } => {
                tracing::debug!("Session {}: joinSession must go through the registry", self.state.id);
                Ok(())
            }
            ClientMessage::StartMatch {
                map_data, match_id, ..
            } => self.start_match(map_data, match_id),
            ClientMessage::BuildCity { tile, city_type, .. } => {
                if let Err(err) = self.build_city(&sender, tile, city_type) {
                    self.send_to(
                        &sender,
                        ServerMessage::CityBuildFailed {
                            tile,
                            reason: err.to_string(),
                        },
                    );
                }
                Ok(())
            }
            ClientMessage::BuildStructure {
                structure, tile, ..
            } => {
                if let Err(err) = self.build_structure(&sender, &structure, tile) {
                    self.send_to(
                        &sender,
                        ServerMessage::StructureBuildFailed {
                            tile,
                            reason: err.to_string(),
                        },
                    );
                }
                Ok(())
            }
            ClientMessage::BuyCard { card, .. } => self.buy_card(&sender, &card),
            ClientMessage::QueueArmy { selected_cards, .. } => {
                self.queue_army(&sender, selected_cards)
            }
            ClientMessage::SelectTarget {
                source_city,
                target_city,
                ..
            } => self.select_target(&sender, source_city, target_city),
            ClientMessage::Ready { step, .. } => {
                self.submit_ready(&sender, step);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.reject(&sender, action, &err);
        }
    }

    /// Apply one timer firing
    pub fn handle_timer(&mut self, key: TimerKey) {
        match key {
            TimerKey::AutoReady { turn, step } => self.on_auto_ready(turn, step),
            TimerKey::ExpansionRing { turn } => self.on_expansion_ring(turn),
            TimerKey::BattleTick { turn } => self.on_battle_tick(turn),
            TimerKey::NewTurnCooldown { turn } => self.on_new_turn_cooldown(turn),
            TimerKey::DisconnectGrace(player_id) => self.on_disconnect_grace(&player_id),
        }
    }

    /// Timer changes queued since the last drain
    pub fn drain_timer_requests(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timer_requests)
    }

    fn schedule(&mut self, key: TimerKey, delay: Duration) {
        self.timer_requests.push(TimerRequest::Start { key, delay });
    }

    fn cancel_timer(&mut self, key: TimerKey) {
        self.timer_requests.push(TimerRequest::Cancel(key));
    }

    pub fn player_for_connection(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.state
            .players
            .values()
            .find(|p| p.connection.as_ref().map(|c| c.id()) == Some(connection_id))
            .map(|p| p.id.clone())
    }

    // === Outbound ===

    fn broadcast(&self, message: ServerMessage) {
        for player in self.state.players.values() {
            player.send(message.clone());
        }
    }

    fn send_to(&self, player_id: &PlayerId, message: ServerMessage) {
        if let Some(player) = self.state.players.get(player_id) {
            player.send(message);
        }
    }

    fn reject(&self, player_id: &PlayerId, action: &str, err: &GameError) {
        tracing::debug!(
            "Session {}: {} rejected for {}: {}",
            self.state.id,
            action,
            player_id,
            err
        );
        self.send_to(
            player_id,
            ServerMessage::ActionRejected {
                action: action.to_string(),
                reason: err.to_string(),
            },
        );
    }

    fn roster(&self) -> Vec<PlayerSummary> {
        self.state
            .players
            .values()
            .map(|p| PlayerSummary {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                color: p.color,
                connected: p.is_connected(),
                ready: p.ready,
                city_count: p.cities.len(),
            })
            .collect()
    }

    pub fn session_update(&self) -> ServerMessage {
        ServerMessage::SessionUpdate {
            session_id: self.state.id.clone(),
            turn_number: self.state.turn_number,
            turn_step: self.state.turn_step,
            phase: self.state.phase(),
            players: self.roster(),
        }
    }

    fn broadcast_session_update(&self) {
        self.broadcast(self.session_update());
    }

    fn phase_changed(&self) -> ServerMessage {
        ServerMessage::PhaseChanged {
            turn_number: self.state.turn_number,
            turn_step: self.state.turn_step,
            phase: self.state.phase(),
        }
    }

    /// Everything `player_id` needs to rebuild its view of the match
    pub fn snapshot_for(&self, player_id: &PlayerId) -> Option<ServerMessage> {
        let player = self.state.players.get(player_id)?;
        Some(ServerMessage::SessionSnapshot {
            session_id: self.state.id.clone(),
            player_id: player_id.clone(),
            match_id: self.state.match_id.clone(),
            map: self.state.map.as_ref().map(|m| m.to_rows()),
            turn_number: self.state.turn_number,
            turn_step: self.state.turn_step,
            phase: self.state.phase(),
            players: self.roster(),
            territories: self.state.territories.clone(),
            cities: self
                .state
                .players
                .values()
                .flat_map(|p| p.cities.iter().cloned())
                .collect(),
            structures: self.state.structures.clone(),
            resources: player.resources,
            hand: player.hand.clone(),
            inventory: player.inventory.to_list(),
            queued_army: player.queued_army.clone(),
            battle_plan: player.battle_plan.clone(),
        })
    }

    fn send_snapshot(&self, player_id: &PlayerId) {
        if let Some(snapshot) = self.snapshot_for(player_id) {
            self.send_to(player_id, snapshot);
        }
    }

    fn send_resources(&self, player_id: &PlayerId) {
        if let Some(player) = self.state.players.get(player_id) {
            player.send(ServerMessage::ResourceUpdate {
                resources: player.resources,
            });
        }
    }

    fn send_inventory(&self, player_id: &PlayerId) {
        if let Some(player) = self.state.players.get(player_id) {
            player.send(ServerMessage::InventoryUpdate {
                hand: player.hand.clone(),
                inventory: player.inventory.to_list(),
            });
        }
    }

    /// Discard the current hand and deal a fresh one
    fn deal_hand(&mut self, player_id: &PlayerId) {
        let hand_size = self.config.hand_size;
        let Some(player) = self.state.players.get_mut(player_id) else {
            return;
        };
        player.hand = player
            .deck
            .deal_hand(hand_size, self.catalog.as_ref(), &mut self.rng);
        let hand = player.hand.clone();
        self.send_to(player_id, ServerMessage::HandDealt { hand });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Synchronous harness: a session plus one receiver per player, with
    //! timers fired by hand instead of by the actor.

    use super::*;
    use crate::cards::{DefaultDecks, StaticCatalog};
    use crate::hex::{TileCoord, TileType};
    use tokio::sync::mpsc::UnboundedReceiver;

    pub struct Harness {
        pub session: Session,
        pub pending: Vec<(TimerKey, Duration)>,
        pub inboxes: Vec<(PlayerId, ConnectionId, UnboundedReceiver<ServerMessage>)>,
    }

    pub fn config() -> GameConfig {
        GameConfig {
            seed: Some(7),
            ..GameConfig::default()
        }
    }

    pub fn grass_map(width: usize, height: usize) -> Vec<Vec<TileType>> {
        vec![vec![TileType::Grass; width]; height]
    }

    impl Harness {
        pub fn new(config: GameConfig) -> Self {
            let catalog = StaticCatalog::with_defaults();
            let decks = DefaultDecks::from_catalog(&catalog);
            Self {
                session: Session::new(
                    SessionId::new("test"),
                    Arc::new(config),
                    Arc::new(catalog),
                    Arc::new(decks),
                ),
                pending: Vec::new(),
                inboxes: Vec::new(),
            }
        }

        pub fn join(&mut self, name: &str) -> PlayerId {
            let player_id = PlayerId::new(name);
            let (connection, rx) = Connection::channel();
            self.inboxes.push((player_id.clone(), connection.id(), rx));
            self.session.join(player_id.clone(), name.to_string(), connection);
            self.sync_timers();
            player_id
        }

        pub fn connection_of(&self, player_id: &PlayerId) -> ConnectionId {
            self.inboxes
                .iter()
                .rev()
                .find(|(p, _, _)| p == player_id)
                .map(|(_, c, _)| *c)
                .unwrap()
        }

        pub fn send(&mut self, player_id: &PlayerId, message: ClientMessage) {
            let connection = self.connection_of(player_id);
            self.session.handle_message(connection, message);
            self.sync_timers();
        }

        pub fn start(&mut self, width: usize, height: usize) {
            let first = self.inboxes[0].0.clone();
            self.send(
                &first,
                ClientMessage::StartMatch {
                    session_id: SessionId::new("test"),
                    map_data: Some(grass_map(width, height)),
                    match_id: Some("m1".into()),
                },
            );
        }

        pub fn build_city(&mut self, player_id: &PlayerId, tile: TileCoord) {
            self.send(
                player_id,
                ClientMessage::BuildCity {
                    session_id: SessionId::new("test"),
                    player_id: player_id.clone(),
                    tile,
                    city_type: None,
                },
            );
        }

        pub fn ready(&mut self, player_id: &PlayerId) {
            let step = self.session.state.turn_step;
            self.send(
                player_id,
                ClientMessage::Ready {
                    session_id: SessionId::new("test"),
                    player_id: player_id.clone(),
                    step,
                },
            );
        }

        pub fn ready_all(&mut self) {
            let players: Vec<PlayerId> = self.session.state.players.keys().cloned().collect();
            for player_id in players {
                self.ready(&player_id);
            }
        }

        pub fn sync_timers(&mut self) {
            for request in self.session.drain_timer_requests() {
                match request {
                    TimerRequest::Start { key, delay } => {
                        self.pending.retain(|(k, _)| k != &key);
                        self.pending.push((key, delay));
                    }
                    TimerRequest::Cancel(key) => self.pending.retain(|(k, _)| k != &key),
                }
            }
        }

        pub fn has_timer(&self, matches: impl Fn(&TimerKey) -> bool) -> bool {
            self.pending.iter().any(|(k, _)| matches(k))
        }

        /// Fire the first pending timer matching `matches`. Returns false if none is pending.
        pub fn fire(&mut self, matches: impl Fn(&TimerKey) -> bool) -> bool {
            let Some(index) = self.pending.iter().position(|(k, _)| matches(k)) else {
                return false;
            };
            let (key, _) = self.pending.remove(index);
            self.session.handle_timer(key);
            self.sync_timers();
            true
        }

        /// Keep firing matching timers until none is left (bounded)
        pub fn fire_all(&mut self, matches: impl Fn(&TimerKey) -> bool) -> usize {
            let mut fired = 0;
            while fired < 100_000 && self.fire(&matches) {
                fired += 1;
            }
            fired
        }

        pub fn drain(&mut self, player_id: &PlayerId) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            for (p, _, rx) in self.inboxes.iter_mut() {
                if p == player_id {
                    while let Ok(message) = rx.try_recv() {
                        messages.push(message);
                    }
                }
            }
            messages
        }

        pub fn clear_inboxes(&mut self) {
            for (_, _, rx) in self.inboxes.iter_mut() {
                while rx.try_recv().is_ok() {}
            }
        }
    }
}
