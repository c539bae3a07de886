//! The shared session: canonical buffer content plus live participants.
//!
//! ```text
//! on_edit(origin, content)
//!       │  write lock held for both steps
//!       ├── content = content          (last-write-wins)
//!       └── BroadcastGroup::broadcast  (tagged with origin)
//!                 │
//!        ┌────────┼────────┐
//!        ▼        ▼        ▼
//!   Participant  ...   Participant    (each skips frames it originated)
//! ```
//!
//! Holding the write lock across the publish gives every participant the
//! same total order of edits, and `connect` takes its snapshot and its
//! subscription under the same lock so a late joiner neither misses an edit
//! nor sees one twice.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

use crate::broadcast::{BroadcastGroup, BroadcastStats, EditFrame};
use crate::protocol::ConnectionId;

/// Session statistics.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub participants: usize,
    pub edits_applied: u64,
    pub edits_dropped: u64,
    pub content_len: usize,
    pub broadcast: BroadcastStats,
}

struct SessionState {
    content: Arc<str>,
    /// Writer of `content`; `None` until the first edit
    last_origin: Option<ConnectionId>,
    participants: HashSet<ConnectionId>,
}

/// Owner of the canonical buffer and the broadcast set.
pub struct SessionStore {
    state: RwLock<SessionState>,
    broadcast: BroadcastGroup,
    edits_applied: AtomicU64,
    edits_dropped: AtomicU64,
}

impl SessionStore {
    /// Create an empty session whose participants buffer up to
    /// `broadcast_capacity` pending updates each.
    pub fn new(broadcast_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(SessionState {
                content: Arc::from(""),
                last_origin: None,
                participants: HashSet::new(),
            }),
            broadcast: BroadcastGroup::new(broadcast_capacity),
            edits_applied: AtomicU64::new(0),
            edits_dropped: AtomicU64::new(0),
        })
    }

    /// Register a new participant.
    ///
    /// The returned handle yields the current content first, so late joiners
    /// see the live buffer, then every later edit made by someone else.
    pub async fn connect(self: &Arc<Self>) -> Participant {
        let id = ConnectionId::new();
        let mut state = self.state.write().await;
        state.participants.insert(id);
        let rx = self.broadcast.subscribe();
        let initial = state.content.clone();
        drop(state);

        log::debug!("Participant {id} connected");
        Participant {
            id,
            pending: Some(initial),
            resync: false,
            rx,
            store: self.clone(),
        }
    }

    /// Apply an edit from `origin` and fan it out to everyone else.
    ///
    /// Replaces the content unconditionally. Edits from a connection that is
    /// no longer registered are dropped and `false` is returned.
    pub async fn on_edit(&self, origin: ConnectionId, content: impl Into<Arc<str>>) -> bool {
        let content = content.into();
        let mut state = self.state.write().await;
        if !state.participants.contains(&origin) {
            drop(state);
            self.edits_dropped.fetch_add(1, Ordering::Relaxed);
            log::debug!("Dropping edit from disconnected participant {origin}");
            return false;
        }

        state.content = content.clone();
        state.last_origin = Some(origin);
        let receivers = self.broadcast.broadcast(EditFrame { origin, content });
        drop(state);

        self.edits_applied.fetch_add(1, Ordering::Relaxed);
        log::trace!("Edit from {origin} fanned out to {receivers} subscribers");
        true
    }

    /// Remove a participant from the broadcast set.
    ///
    /// Returns `false` if it was already gone.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.state.write().await.participants.remove(&id);
        if removed {
            log::debug!("Participant {id} disconnected");
        }
        removed
    }

    /// Current canonical content.
    pub async fn content(&self) -> Arc<str> {
        self.state.read().await.content.clone()
    }

    pub async fn is_connected(&self, id: ConnectionId) -> bool {
        self.state.read().await.participants.contains(&id)
    }

    pub async fn participant_count(&self) -> usize {
        self.state.read().await.participants.len()
    }

    pub async fn stats(&self) -> SessionStats {
        let state = self.state.read().await;
        SessionStats {
            participants: state.participants.len(),
            edits_applied: self.edits_applied.load(Ordering::Relaxed),
            edits_dropped: self.edits_dropped.load(Ordering::Relaxed),
            content_len: state.content.len(),
            broadcast: self.broadcast.stats(),
        }
    }
}

/// One participant's view of the session's update stream.
pub struct Participant {
    id: ConnectionId,
    pending: Option<Arc<str>>,
    resync: bool,
    rx: broadcast::Receiver<Arc<EditFrame>>,
    store: Arc<SessionStore>,
}

impl Participant {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next content this participant should display.
    ///
    /// Frames originated by this participant are skipped. After falling
    /// behind the broadcast buffer, the current content is yielded instead
    /// of the skipped frames, unless this participant wrote it.
    /// Cancel-safe: usable inside `tokio::select!`.
    pub async fn next_update(&mut self) -> Option<Arc<str>> {
        if let Some(content) = self.pending.take() {
            return Some(content);
        }

        loop {
            if self.resync {
                // Frames still buffered are older than the snapshot; start
                // again from the tail.
                let state = self.store.state.read().await;
                self.rx = self.rx.resubscribe();
                let own = state.last_origin == Some(self.id);
                let content = state.content.clone();
                drop(state);
                self.resync = false;
                if own {
                    continue;
                }
                return Some(content);
            }

            match self.rx.recv().await {
                Ok(frame) if frame.origin == self.id => continue,
                Ok(frame) => return Some(frame.content.clone()),
                Err(RecvError::Lagged(n)) => {
                    log::warn!("Participant {} lagged by {n} updates, resyncing", self.id);
                    self.store.broadcast.record_lag(n);
                    self.resync = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Edit the session as this participant.
    pub async fn edit(&self, content: impl Into<Arc<str>>) -> bool {
        self.store.on_edit(self.id, content).await
    }

    /// Leave the session. Safe to call more than once.
    pub async fn disconnect(&self) -> bool {
        self.store.disconnect(self.id).await
    }
}
