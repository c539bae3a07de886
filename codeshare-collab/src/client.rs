//! WebSocket sync client for joining the shared session.
//!
//! Provides:
//! - Connection lifecycle (connect, disconnect)
//! - Full-buffer edit transmission
//! - Remote updates delivered as [`SyncEvent`]s
//!
//! Edits attempted while disconnected are dropped: there is no offline
//! queue and no resync on reconnect beyond the snapshot the server sends to
//! every newly connected participant.

use std::sync::Arc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::protocol::{ClientEvent, ProtocolError, ServerEvent};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events emitted by the sync client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Connection established
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// Buffer content pushed by the server
    RemoteUpdate(String),
}

/// The sync client.
pub struct SyncClient {
    /// Connection state, shared with the reader task
    state: Arc<RwLock<ConnectionState>>,

    /// Channel to the WebSocket writer task
    outgoing_tx: RwLock<Option<mpsc::Sender<Message>>>,

    /// Event receiver for the application
    event_rx: Option<mpsc::Receiver<SyncEvent>>,

    /// Event sender (held by the reader task)
    event_tx: mpsc::Sender<SyncEvent>,

    /// Reader task of the current connection
    reader_task: RwLock<Option<JoinHandle<()>>>,

    server_url: String,
}

impl SyncClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            outgoing_tx: RwLock::new(None),
            event_rx: Some(event_rx),
            event_tx,
            reader_task: RwLock::new(None),
            server_url: server_url.into(),
        }
    }

    /// Take the event receiver (can only be called once).
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Connect to the server.
    ///
    /// Spawns background tasks for reading and writing WebSocket frames.
    /// Does nothing if a connection is already live or being established.
    pub async fn connect(&self) -> Result<(), ProtocolError> {
        {
            let mut state = self.state.write().await;
            if *state != ConnectionState::Disconnected {
                log::debug!("Already {:?} to {}", *state, self.server_url);
                return Ok(());
            }
            *state = ConnectionState::Connecting;
        }

        // A reader left over from a closed connection must not report on
        // this one.
        if let Some(stale) = self.reader_task.write().await.take() {
            stale.abort();
        }

        let ws_stream = match tokio_tungstenite::connect_async(&self.server_url).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                log::warn!("Failed to connect to {}: {e}", self.server_url);
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ProtocolError::ConnectionClosed);
            }
        };
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        // Writer task: forward outgoing channel to WebSocket
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(256);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if ws_writer.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });
        *self.outgoing_tx.write().await = Some(out_tx);

        *self.state.write().await = ConnectionState::Connected;
        let _ = self.event_tx.send(SyncEvent::Connected).await;
        log::info!("Connected to {}", self.server_url);

        // Reader task: turn server frames into events
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match ServerEvent::decode(text.as_str()) {
                        Ok(ServerEvent::UpdateCode(content)) => {
                            let _ = event_tx.send(SyncEvent::RemoteUpdate(content)).await;
                        }
                        Err(e) => log::warn!("Ignoring malformed server frame: {e}"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }

            *state.write().await = ConnectionState::Disconnected;
            let _ = event_tx.send(SyncEvent::Disconnected).await;
        });
        *self.reader_task.write().await = Some(reader);

        Ok(())
    }

    /// Send the full buffer to the server.
    ///
    /// Returns `Ok(false)` without sending when the connection is not live.
    pub async fn send_edit(&self, content: impl Into<String>) -> Result<bool, ProtocolError> {
        if self.connection_state().await != ConnectionState::Connected {
            log::debug!("Not connected, dropping edit");
            return Ok(false);
        }

        let frame = ClientEvent::CodeChange(content.into()).encode()?;
        let outgoing = self.outgoing_tx.read().await;
        match outgoing.as_ref() {
            Some(tx) => {
                tx.send(Message::Text(frame.into()))
                    .await
                    .map_err(|_| ProtocolError::ConnectionClosed)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close the connection. No-op when already disconnected.
    pub async fn disconnect(&self) {
        if let Some(tx) = self.outgoing_tx.write().await.take() {
            let _ = tx.send(Message::Close(None)).await;
        }
        *self.state.write().await = ConnectionState::Disconnected;
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection_state().await == ConnectionState::Connected
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SyncClient::new("ws://localhost:5001");
        assert_eq!(client.server_url(), "ws://localhost:5001");
    }

    #[tokio::test]
    async fn test_client_initial_state() {
        let client = SyncClient::new("ws://localhost:5001");
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_send_edit_offline_is_dropped() {
        let client = SyncClient::new("ws://localhost:5001");
        assert!(!client.send_edit("print(1)").await.unwrap());
        assert!(!client.send_edit("print(2)").await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_to_nothing_fails() {
        // Port 9 (discard) is essentially never serving WebSockets locally
        let client = SyncClient::new("ws://127.0.0.1:9");
        assert_eq!(client.connect().await, Err(ProtocolError::ConnectionClosed));
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_when_never_connected() {
        let client = SyncClient::new("ws://localhost:5001");
        client.disconnect().await;
        assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_take_event_rx() {
        let mut client = SyncClient::new("ws://localhost:5001");
        assert!(client.take_event_rx().is_some());
        assert!(client.take_event_rx().is_none());
    }
}
