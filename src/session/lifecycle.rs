//! Joining, reconnecting, disconnecting and removal after the grace period

use crate::cards::DeckRuntime;
use crate::core::error::GameError;
use crate::core::types::{ConnectionId, PlayerColor, PlayerId};
use crate::session::{Connection, ServerMessage, Session, TimerKey};
use crate::state::Player;

impl Session {
    /// Bind `connection` to `player_id`, creating the player if new
    ///
    /// A known player id is a reconnect: the connection is rebound, any
    /// pending removal is cancelled and a full snapshot goes to the rejoining
    /// connection only.
    pub fn join(&mut self, player_id: PlayerId, display_name: String, connection: Connection) {
        if let Some(player) = self.state.players.get_mut(&player_id) {
            player.connection = Some(connection);
            if !display_name.is_empty() {
                player.display_name = display_name;
            }
            tracing::info!("Session {}: {} reconnected", self.state.id, player_id);
            self.cancel_timer(TimerKey::DisconnectGrace(player_id.clone()));
            self.send_snapshot(&player_id);
            self.broadcast_session_update();
            return;
        }

        let Some(color) = PlayerColor::next_free(self.state.players.values().map(|p| &p.color))
        else {
            tracing::info!("Session {}: full, rejecting {}", self.state.id, player_id);
            connection.send(ServerMessage::ActionRejected {
                action: "joinSession".into(),
                reason: GameError::SessionFull.to_string(),
            });
            return;
        };

        let entries = self.decks.deck_for(&player_id);
        let deck = DeckRuntime::from_entries(&entries, self.catalog.as_ref());
        let mut player = Player::new(player_id.clone(), display_name, color, deck, &self.config);
        player.connection = Some(connection);
        self.state.players.insert(player_id.clone(), player);
        tracing::info!(
            "Session {}: {} joined as {:?}",
            self.state.id,
            player_id,
            color
        );

        if self.state.is_started() {
            self.deal_hand(&player_id);
        }
        self.send_snapshot(&player_id);
        self.broadcast_session_update();
    }

    /// Connection closed. Acts on every player still bound to
    /// `connection_id`; a superseded connection closing is ignored.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        let bound: Vec<PlayerId> = self
            .state
            .players
            .values()
            .filter(|p| p.connection.as_ref().map(|c| c.id()) == Some(connection_id))
            .map(|p| p.id.clone())
            .collect();
        if bound.is_empty() {
            tracing::debug!(
                "Session {}: ignoring close of unbound connection {}",
                self.state.id,
                connection_id
            );
            return;
        }

        let grace = self.config.disconnect_grace();
        for player_id in bound {
            if let Some(player) = self.state.players.get_mut(&player_id) {
                player.connection = None;
            }
            tracing::info!(
                "Session {}: {} disconnected, holding slot for {:?}",
                self.state.id,
                player_id,
                grace
            );
            self.schedule(TimerKey::DisconnectGrace(player_id), grace);
        }
        self.broadcast_session_update();
        // The remaining players may now all be ready
        self.advance_if_all_ready();
    }

    pub(crate) fn on_disconnect_grace(&mut self, player_id: &PlayerId) {
        match self.state.players.get(player_id) {
            Some(player) if !player.is_connected() => self.remove_player(player_id),
            _ => {}
        }
    }

    /// Drop a player and everything they own on the board
    pub fn remove_player(&mut self, player_id: &PlayerId) {
        if self.state.players.remove(player_id).is_none() {
            return;
        }
        if let Some(expansion) = self.state.expansion.as_mut() {
            expansion.forget(player_id);
        }
        self.state.release_territory(player_id);
        self.state.structures.retain(|s| &s.owner != player_id);
        self.state.battle_units.retain(|u| &u.owner != player_id);
        self.state.battles_outstanding.remove(player_id);
        tracing::info!("Session {}: {} removed", self.state.id, player_id);

        self.broadcast(ServerMessage::PlayerRemoved {
            player_id: player_id.clone(),
        });
        self.broadcast_session_update();

        if self.state.players.is_empty() {
            tracing::info!("Session {}: no players left, closing", self.state.id);
            self.closed = true;
            return;
        }
        self.advance_if_all_ready();
    }
}
