//! Outbound half of a client connection

use tokio::sync::mpsc;

use crate::core::types::ConnectionId;
use crate::session::protocol::ServerMessage;

/// Handle a session uses to push messages to one client
///
/// The network layer owns the receiving end and writes frames to the socket.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            tx,
        }
    }

    /// A fresh connection plus the receiver its messages arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message. A closed socket is not an error here; the disconnect
    /// arrives separately through the registry.
    pub fn send(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("Dropping message for closed connection {}", self.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
