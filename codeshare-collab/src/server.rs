//! WebSocket sync server for the shared session.
//!
//! Architecture:
//! ```text
//! Client A ──┐                       ┌──► Client B  update-code
//!            ├── code-change ──► SessionStore ──┤
//! Client B ──┘                       └──► Client C  update-code
//! ```
//!
//! Each accepted socket gets its own task running a `select!` loop over
//! inbound frames and outbound session updates. A failed send or a broken
//! socket only ends that participant's task; nobody else notices.

use std::net::SocketAddr;
use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::protocol::{ClientEvent, ProtocolError, ServerEvent};
use crate::session::{Participant, SessionStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sync server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// Pending updates buffered per participant before it must resync
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5001".to_string(),
            broadcast_capacity: 256,
        }
    }
}

/// Server statistics.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub edits_received: u64,
    pub bytes_received: u64,
    pub malformed_frames: u64,
}

/// The sync server.
pub struct SyncServer {
    config: ServerConfig,
    store: Arc<SessionStore>,
    stats: Arc<RwLock<ServerStats>>,
}

impl SyncServer {
    /// Create a server with a fresh, empty session.
    pub fn new(config: ServerConfig) -> Self {
        let store = SessionStore::new(config.broadcast_capacity);
        Self::with_store(config, store)
    }

    /// Create a server around an existing session.
    pub fn with_store(config: ServerConfig, store: Arc<SessionStore>) -> Self {
        Self {
            config,
            store,
            stats: Arc::new(RwLock::new(ServerStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(&self.config.bind_addr).await
    }

    /// Bind and serve until the process exits.
    pub async fn run(&self) -> Result<(), BoxError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept WebSocket connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BoxError> {
        log::info!("Sync server listening on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("Failed to accept connection: {e}");
                    continue;
                }
            };
            log::debug!("New TCP connection from {addr}");

            let store = self.store.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, store, stats).await {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    /// Handle a single WebSocket connection from upgrade to cleanup.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        store: Arc<SessionStore>,
        stats: Arc<RwLock<ServerStats>>,
    ) -> Result<(), BoxError> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let participant = store.connect().await;
        let id = participant.id();
        log::info!("Participant {id} connected from {addr}");

        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        let result = Self::pump(ws_stream, participant, &store, &stats).await;

        store.disconnect(id).await;
        stats.write().await.active_connections -= 1;
        log::info!("Participant {id} disconnected ({addr})");

        result
    }

    /// Relay frames until either side goes away.
    async fn pump(
        ws_stream: WebSocketStream<TcpStream>,
        mut participant: Participant,
        store: &SessionStore,
        stats: &RwLock<ServerStats>,
    ) -> Result<(), BoxError> {
        let id = participant.id();
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match ClientEvent::decode(text.as_str()) {
                                Ok(ClientEvent::CodeChange(content)) => {
                                    {
                                        let mut s = stats.write().await;
                                        s.edits_received += 1;
                                        s.bytes_received += content.len() as u64;
                                    }
                                    log::debug!("Edit from {id} ({} bytes)", content.len());
                                    store.on_edit(id, content).await;
                                }
                                Err(e) => {
                                    stats.write().await.malformed_frames += 1;
                                    log::warn!("Ignoring malformed frame from {id}: {e}");
                                }
                            }
                        }

                        Some(Ok(Message::Binary(data))) => {
                            stats.write().await.malformed_frames += 1;
                            let e = ProtocolError::UnexpectedFrame(format!(
                                "{} byte binary frame",
                                data.len()
                            ));
                            log::warn!("Ignoring frame from {id}: {e}");
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if ws_sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }

                        Some(Ok(Message::Close(_))) | None => break,

                        Some(Err(e)) => {
                            log::debug!("WebSocket error from {id}: {e}");
                            break;
                        }

                        _ => {}
                    }
                }

                update = participant.next_update() => {
                    let Some(content) = update else { break };
                    let frame = ServerEvent::UpdateCode(content.to_string()).encode()?;
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        // Dead socket: the update is dropped, never retried
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn stats(&self) -> ServerStats {
        self.stats.read().await.clone()
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}
