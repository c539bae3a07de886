//! Client-side edit coordination: optimistic local view plus debounced
//! transmission.
//!
//! ```text
//! keystroke ──► EditCoordinator::local_edit ──► view updated now
//!                        │
//!                        └── DebounceTimer re-armed (300ms)
//!                                   │ quiet period elapsed
//!                                   ▼
//!                           flush(live) ──► SyncClient::send_edit
//!
//! server update ──► EditCoordinator::remote_update ──► view only
//! ```
//!
//! [`EditCoordinator`] is a plain state machine that takes the current time
//! as an argument, so its timing is testable with a logical clock.
//! [`spawn_coordinator`] drives it on a tokio task against a real client.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::{SyncClient, SyncEvent};

/// Quiet period after the last keystroke before an edit is sent.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A cancellable one-shot deadline. Re-arming replaces the old deadline.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    /// Arm (or reset) the timer to fire `window` after `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Outcome of [`EditCoordinator::flush`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flush {
    /// Nothing due yet.
    Idle,
    /// Send this content now.
    Transmit(String),
    /// The timer fired while offline; the edit is gone.
    Dropped,
}

/// Local buffer view with a debounced outgoing edit.
#[derive(Debug, Clone)]
pub struct EditCoordinator {
    view: String,
    pending: Option<String>,
    timer: DebounceTimer,
}

impl Default for EditCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl EditCoordinator {
    pub fn new(window: Duration) -> Self {
        Self {
            view: String::new(),
            pending: None,
            timer: DebounceTimer::new(window),
        }
    }

    /// Apply a local edit to the view and restart the quiet period.
    pub fn local_edit(&mut self, now: Instant, content: impl Into<String>) {
        self.view = content.into();
        self.pending = Some(self.view.clone());
        self.timer.arm(now);
    }

    /// Overwrite the view with content from the server.
    ///
    /// Leaves any pending local edit and its timer untouched, so a remote
    /// update never causes a transmission of its own.
    pub fn remote_update(&mut self, content: impl Into<String>) {
        self.view = content.into();
    }

    /// Fire the timer if it is due.
    pub fn flush(&mut self, now: Instant, live: bool) -> Flush {
        if !self.timer.is_due(now) {
            return Flush::Idle;
        }
        self.timer.cancel();

        match self.pending.take() {
            Some(content) if live => Flush::Transmit(content),
            Some(_) => {
                log::debug!("Connection not live, dropping debounced edit");
                Flush::Dropped
            }
            None => Flush::Idle,
        }
    }

    /// Discard the pending edit and disarm the timer.
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.pending = None;
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Handle to a running coordinator task. Dropping it stops the task and
/// cancels any pending transmission.
pub struct CoordinatorHandle {
    local_tx: mpsc::UnboundedSender<String>,
    view_rx: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Report a local edit. Returns `false` once the task has stopped.
    pub fn local_edit(&self, content: impl Into<String>) -> bool {
        self.local_tx.send(content.into()).is_ok()
    }

    /// Current local view.
    pub fn view(&self) -> String {
        self.view_rx.borrow().clone()
    }

    /// Watch the local view for changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.view_rx.clone()
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run an [`EditCoordinator`] against `client`, consuming its events.
pub fn spawn_coordinator(
    client: Arc<SyncClient>,
    mut events: mpsc::Receiver<SyncEvent>,
    window: Duration,
) -> CoordinatorHandle {
    let (local_tx, mut local_rx) = mpsc::unbounded_channel::<String>();
    let (view_tx, view_rx) = watch::channel(String::new());

    let task = tokio::spawn(async move {
        let mut coordinator = EditCoordinator::new(window);
        let mut events_open = true;

        loop {
            let deadline = coordinator.deadline();

            tokio::select! {
                edit = local_rx.recv() => {
                    let Some(content) = edit else { break };
                    coordinator.local_edit(Instant::now(), content);
                    view_tx.send_replace(coordinator.view().to_string());
                }

                event = events.recv(), if events_open => {
                    match event {
                        Some(SyncEvent::RemoteUpdate(content)) => {
                            coordinator.remote_update(content);
                            view_tx.send_replace(coordinator.view().to_string());
                        }
                        Some(SyncEvent::Connected) => log::debug!("Coordinator: connection live"),
                        Some(SyncEvent::Disconnected) => log::debug!("Coordinator: connection lost"),
                        None => events_open = false,
                    }
                }

                _ = sleep_until_deadline(deadline) => {
                    let live = client.is_connected().await;
                    if let Flush::Transmit(content) = coordinator.flush(Instant::now(), live) {
                        if let Err(e) = client.send_edit(content).await {
                            log::warn!("Failed to send edit: {e}");
                        }
                    }
                }
            }
        }

        coordinator.cancel();
    });

    CoordinatorHandle { local_tx, view_rx, task }
}

/// Completes at `deadline`, or never when there is none.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
