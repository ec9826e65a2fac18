//! TCP front end
//!
//! One reader task per socket decodes `ClientMessage` lines and hands them to
//! the registry. One writer task per socket drains that connection's outbound
//! channel. A closed socket is reported to the registry as a disconnect; the
//! session decides what that means.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::error::ServerError;
use crate::session::{ClientMessage, Connection, ServerMessage, SessionRegistry};

/// Bind `addr` and serve in the background. Returns the bound address, which
/// differs from `addr` when port 0 was requested.
pub async fn start(
    addr: &str,
    registry: Arc<SessionRegistry>,
) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let task = tokio::spawn(async move {
        if let Err(e) = serve(listener, registry).await {
            tracing::error!("Server stopped: {}", e);
        }
    });
    Ok((local, task))
}

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, registry: Arc<SessionRegistry>) -> Result<(), ServerError> {
    tracing::info!("Listening on {}", listener.local_addr()?);
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            handle_socket(stream, peer, registry).await;
        });
    }
}

async fn handle_socket(stream: TcpStream, peer: SocketAddr, registry: Arc<SessionRegistry>) {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    let (connection, outbound) = Connection::channel();
    tracing::info!("Connection {} from {}", connection.id(), peer);

    let writer = tokio::spawn(write_loop(write_half, outbound));

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(line) {
                    Ok(message) => registry.route(&connection, message).await,
                    Err(e) => {
                        tracing::debug!("Connection {}: bad message: {}", connection.id(), e);
                        connection.send(ServerMessage::ActionRejected {
                            action: "parse".into(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Connection {}: read failed: {}", connection.id(), e);
                break;
            }
        }
    }

    tracing::info!("Connection {} from {} closed", connection.id(), peer);
    registry.on_disconnect(connection.id()).await;
    // The sessions still hold clones of the sender, so stop the writer directly
    writer.abort();
}

async fn write_loop(
    mut socket: tokio::net::tcp::OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let mut line = match serde_json::to_vec(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to encode {:?}: {}", message, e);
                continue;
            }
        };
        line.push(b'\n');
        if let Err(e) = socket.write_all(&line).await {
            tracing::debug!("Write failed: {}", e);
            break;
        }
    }
}
