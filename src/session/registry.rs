//! Session lookup and message routing
//!
//! Sessions are created lazily by the first join and removed when their actor
//! exits. Each connection is bound to at most one session at a time.

use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::cards::{CardCatalog, DeckProvider};
use crate::core::config::GameConfig;
use crate::core::error::GameError;
use crate::core::types::{ConnectionId, PlayerId, SessionId};
use crate::session::{ClientMessage, Connection, ServerMessage, Session, SessionCommand, SessionHandle};

type Sessions = Arc<RwLock<AHashMap<SessionId, SessionHandle>>>;

pub struct SessionRegistry {
    config: Arc<GameConfig>,
    catalog: Arc<dyn CardCatalog>,
    decks: Arc<dyn DeckProvider>,
    sessions: Sessions,
    bindings: Mutex<AHashMap<ConnectionId, SessionId>>,
}

impl SessionRegistry {
    pub fn new(
        config: GameConfig,
        catalog: Arc<dyn CardCatalog>,
        decks: Arc<dyn DeckProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            decks,
            sessions: Arc::new(RwLock::new(AHashMap::new())),
            bindings: Mutex::new(AHashMap::new()),
        }
    }

    /// Dispatch one decoded message from `connection`
    pub async fn route(&self, connection: &Connection, message: ClientMessage) {
        if let ClientMessage::JoinSession {
            session_id,
            player_id,
            display_name,
        } = message
        {
            self.join(session_id, player_id, display_name, connection.clone())
                .await;
            return;
        }

        let session_id = message.session_id().clone();
        let action = message.name();
        let Some(handle) = self.sessions.read().await.get(&session_id).cloned() else {
            tracing::debug!("{} for unknown session {}", action, session_id);
            connection.send(ServerMessage::ActionRejected {
                action: action.into(),
                reason: GameError::UnknownSession(session_id).to_string(),
            });
            return;
        };
        let command = SessionCommand::Message {
            connection_id: connection.id(),
            message,
        };
        if handle.send(command).is_err() {
            tracing::debug!("{} for session {} dropped, actor gone", action, session_id);
        }
    }

    /// Bind `connection` to `player_id` in `session_id`, creating the session
    /// if it does not exist yet
    pub async fn join(
        &self,
        session_id: SessionId,
        player_id: PlayerId,
        display_name: String,
        connection: Connection,
    ) {
        // Moving to a different session counts as leaving the old one
        let previous = self
            .bindings
            .lock()
            .await
            .insert(connection.id(), session_id.clone());
        if let Some(previous) = previous.filter(|p| p != &session_id) {
            self.notify_disconnect(&previous, connection.id()).await;
        }

        let mut command = SessionCommand::Join {
            player_id,
            display_name,
            connection,
        };
        // An actor can exit between lookup and send; a second attempt creates
        // a fresh session
        for _ in 0..2 {
            let handle = self.get_or_create(&session_id).await;
            match handle.send(command) {
                Ok(()) => return,
                Err(returned) => {
                    command = returned;
                    self.forget(&session_id, &handle).await;
                }
            }
        }
        tracing::warn!("Session {}: join dropped, actor unavailable", session_id);
    }

    /// The connection closed
    pub async fn on_disconnect(&self, connection_id: ConnectionId) {
        let bound = self.bindings.lock().await.remove(&connection_id);
        if let Some(session_id) = bound {
            self.notify_disconnect(&session_id, connection_id).await;
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    async fn notify_disconnect(&self, session_id: &SessionId, connection_id: ConnectionId) {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            let _ = handle.send(SessionCommand::Disconnected { connection_id });
        }
    }

    async fn get_or_create(&self, session_id: &SessionId) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(session_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let session = Session::new(
            session_id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.catalog),
            Arc::clone(&self.decks),
        );
        let (handle, task) = SessionHandle::spawn(session);
        sessions.insert(session_id.clone(), handle.clone());
        tracing::info!("Session {} created ({} active)", session_id, sessions.len());

        // Drop the entry once the actor exits, unless it was already replaced
        let registry = Arc::clone(&self.sessions);
        let watched = handle.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!("Session {} actor failed: {}", id, e);
            }
            let mut sessions = registry.write().await;
            if sessions.get(&id).is_some_and(|h| h.same_channel(&watched)) {
                sessions.remove(&id);
                tracing::info!("Session {} removed ({} active)", id, sessions.len());
            }
        });

        handle
    }

    async fn forget(&self, session_id: &SessionId, stale: &SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(session_id).is_some_and(|h| h.same_channel(stale)) {
            sessions.remove(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{DefaultDecks, StaticCatalog};
    use crate::session::test_support::config;
    use std::time::Duration;

    fn registry() -> SessionRegistry {
        let catalog = StaticCatalog::with_defaults();
        let decks = DefaultDecks::from_catalog(&catalog);
        SessionRegistry::new(config(), Arc::new(catalog), Arc::new(decks))
    }

    fn join_message(session: &str, player: &str) -> ClientMessage {
        ClientMessage::JoinSession {
            session_id: SessionId::new(session),
            player_id: PlayerId::new(player),
            display_name: player.to_uppercase(),
        }
    }

    #[tokio::test]
    async fn test_join_creates_session_once() {
        let registry = registry();
        let (alice, mut alice_rx) = Connection::channel();
        let (bob, _bob_rx) = Connection::channel();
        registry.route(&alice, join_message("s1", "alice")).await;
        registry.route(&bob, join_message("s1", "bob")).await;

        assert_eq!(registry.session_count().await, 1);
        assert!(matches!(
            alice_rx.recv().await.unwrap(),
            ServerMessage::SessionSnapshot { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let registry = registry();
        let (connection, mut rx) = Connection::channel();
        registry
            .route(
                &connection,
                ClientMessage::BuyCard {
                    session_id: SessionId::new("nope"),
                    player_id: PlayerId::new("alice"),
                    card: crate::core::types::CardId::new("militia"),
                },
            )
            .await;
        match rx.recv().await.unwrap() {
            ServerMessage::ActionRejected { action, reason } => {
                assert_eq!(action, "buyCard");
                assert_eq!(reason, "no session nope");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_removed_after_last_player_leaves() {
        let registry = registry();
        let (alice, _rx) = Connection::channel();
        registry.route(&alice, join_message("s1", "alice")).await;
        registry.on_disconnect(alice.id()).await;

        tokio::time::sleep(config().disconnect_grace() + Duration::from_millis(50)).await;
        // Let the teardown watcher run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!registry.contains(&SessionId::new("s1")).await);

        // Joining again starts a fresh match
        let (again, mut rx) = Connection::channel();
        registry.route(&again, join_message("s1", "alice")).await;
        match rx.recv().await.unwrap() {
            ServerMessage::SessionSnapshot { turn_number, .. } => assert_eq!(turn_number, 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_switching_sessions_disconnects_from_previous() {
        let registry = registry();
        let (alice, _alice_rx) = Connection::channel();
        let (bob, mut bob_rx) = Connection::channel();
        registry.route(&bob, join_message("s1", "bob")).await;
        registry.route(&alice, join_message("s1", "alice")).await;
        registry.route(&alice, join_message("s2", "alice")).await;
        assert_eq!(registry.session_count().await, 2);

        // Bob eventually sees alice marked disconnected in s1
        let mut saw_disconnect = false;
        while let Ok(Some(message)) =
            tokio::time::timeout(Duration::from_millis(200), bob_rx.recv()).await
        {
            if let ServerMessage::SessionUpdate { players, .. } = message {
                if players
                    .iter()
                    .any(|p| p.player_id == PlayerId::new("alice") && !p.connected)
                {
                    saw_disconnect = true;
                    break;
                }
            }
        }
        assert!(saw_disconnect);
    }
}
