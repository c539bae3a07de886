//! Fan-out of edit frames to every subscribed participant.
//!
//! Uses a tokio broadcast channel so one send reaches all subscribers.
//! Each subscriber buffers up to `capacity` frames; slower subscribers lag
//! and must resynchronize from the session content.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::ConnectionId;

/// A full-buffer snapshot tagged with the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFrame {
    pub origin: ConnectionId,
    pub content: Arc<str>,
}

/// Statistics for monitoring broadcast health.
#[derive(Debug, Clone, Default)]
pub struct BroadcastStats {
    pub messages_sent: u64,
    pub messages_lagged: u64,
    pub subscribers: usize,
}

/// Lock-free counters updated on the hot path.
#[derive(Default)]
struct AtomicBroadcastStats {
    messages_sent: AtomicU64,
    messages_lagged: AtomicU64,
}

/// Broadcast group for the shared session.
pub struct BroadcastGroup {
    sender: broadcast::Sender<Arc<EditFrame>>,
    capacity: usize,
    atomic_stats: Arc<AtomicBroadcastStats>,
}

impl BroadcastGroup {
    /// Create a new broadcast group with the given per-subscriber buffer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            capacity: capacity.max(1),
            atomic_stats: Arc::new(AtomicBroadcastStats::default()),
        }
    }

    /// Subscribe to frames sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EditFrame>> {
        self.sender.subscribe()
    }

    /// Send a frame to every subscriber, the origin included.
    ///
    /// Filtering out the origin is the receiver's job. Returns the number of
    /// subscribers the frame was queued for (0 when nobody listens).
    pub fn broadcast(&self, frame: EditFrame) -> usize {
        let count = self.sender.send(Arc::new(frame)).unwrap_or(0);
        self.atomic_stats.messages_sent.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Record that a subscriber skipped `n` frames.
    pub fn record_lag(&self, n: u64) {
        self.atomic_stats.messages_lagged.fetch_add(n, Ordering::Relaxed);
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            messages_sent: self.atomic_stats.messages_sent.load(Ordering::Relaxed),
            messages_lagged: self.atomic_stats.messages_lagged.load(Ordering::Relaxed),
            subscribers: self.sender.receiver_count(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
