//! The task that owns a `Session`
//!
//! Every command and every timer firing for one match is applied here, one at
//! a time, so session logic never needs a lock.

use tokio::sync::mpsc;

use crate::core::types::{ConnectionId, PlayerId};
use crate::session::timers::Fired;
use crate::session::{ClientMessage, Connection, Session, TimerSet};

/// Inbound work for a session actor
#[derive(Debug)]
pub enum SessionCommand {
    Join {
        player_id: PlayerId,
        display_name: String,
        connection: Connection,
    },
    Message {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
}

/// Cheap, cloneable address of a running session actor
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Spawn the actor for `session` and return its address and join handle
    pub fn spawn(session: Session) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(session, rx));
        (Self { tx }, task)
    }

    /// Queue a command. Returns the command back if the actor has exited.
    pub fn send(&self, command: SessionCommand) -> Result<(), SessionCommand> {
        self.tx.send(command).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Whether both handles address the same actor
    pub fn same_channel(&self, other: &SessionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

async fn run(mut session: Session, mut inbox: mpsc::UnboundedReceiver<SessionCommand>) {
    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel::<Fired>();
    let mut timers = TimerSet::new(fired_tx);
    tracing::info!("Session {}: actor started", session.id());

    loop {
        tokio::select! {
            command = inbox.recv() => {
                let Some(command) = command else {
                    break;
                };
                match command {
                    SessionCommand::Join { player_id, display_name, connection } => {
                        session.join(player_id, display_name, connection);
                    }
                    SessionCommand::Message { connection_id, message } => {
                        session.handle_message(connection_id, message);
                    }
                    SessionCommand::Disconnected { connection_id } => {
                        session.disconnect(connection_id);
                    }
                }
            }
            Some(fired) = fired_rx.recv() => {
                if timers.take_fired(&fired) {
                    session.handle_timer(fired.key);
                }
            }
        }

        for request in session.drain_timer_requests() {
            timers.apply(request);
        }
        if session.should_close() {
            break;
        }
    }

    timers.cancel_all();
    tracing::info!("Session {}: actor stopped", session.id());
}
