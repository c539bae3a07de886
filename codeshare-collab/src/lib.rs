//! # codeshare-collab: real-time buffer sharing
//!
//! Keeps one shared text buffer in sync across every connected participant.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   code-change    ┌──────────────┐
//! │ EditCoordinator  │ ───────────────► │  SyncServer  │
//! │ (debounce 300ms) │                  │ (per socket) │
//! └────────┬─────────┘ ◄─────────────── └──────┬───────┘
//!          │            update-code            │
//!          ▼                                   ▼
//! ┌──────────────────┐                  ┌──────────────┐
//! │   SyncClient     │                  │ SessionStore │
//! │  (WebSocket)     │                  │ (last write  │
//! └──────────────────┘                  │  wins)       │
//!                                       └──────┬───────┘
//!                                              │
//!                                      ┌───────┴────────┐
//!                                      │ BroadcastGroup │
//!                                      │ (fan-out)      │
//!                                      └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: JSON text frames (`code-change`, `update-code`)
//! - [`broadcast`]: origin-tagged fan-out with lag tracking
//! - [`session`]: canonical content and participant registry
//! - [`server`]: WebSocket sync server
//! - [`client`]: WebSocket sync client
//! - [`coordinator`]: optimistic local view with debounced sends

pub mod protocol;
pub mod broadcast;
pub mod session;
pub mod server;
pub mod client;
pub mod coordinator;

// Re-exports for convenience
pub use protocol::{ClientEvent, ConnectionId, ProtocolError, ServerEvent};
pub use broadcast::{BroadcastGroup, BroadcastStats, EditFrame};
pub use session::{Participant, SessionStats, SessionStore};
pub use server::{ServerConfig, ServerStats, SyncServer};
pub use client::{ConnectionState, SyncClient, SyncEvent};
pub use coordinator::{
    spawn_coordinator, CoordinatorHandle, DebounceTimer, EditCoordinator, Flush,
    DEFAULT_DEBOUNCE,
};
