//! # codeshare-server: process wiring
//!
//! Runs the sync WebSocket listener and the HTTP API side by side on one
//! tokio runtime. They share nothing: a slow execution request never holds
//! up buffer synchronization.

pub mod api;
pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use codeshare_collab::{SessionStore, SyncServer};
use codeshare_exec::ExecutionProxy;
use tokio::net::TcpListener;

pub use api::ApiState;
pub use config::{Config, ConfigError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Both listeners, bound and ready to serve.
pub struct App {
    sync: SyncServer,
    sync_listener: TcpListener,
    http_listener: TcpListener,
    api_state: ApiState,
}

impl App {
    /// Bind both listeners and build the execution proxy.
    pub async fn bind(config: &Config) -> Result<Self, BoxError> {
        let proxy = ExecutionProxy::new(config.execution_endpoint.as_str())?;
        let sync = SyncServer::new(config.sync.clone());
        let sync_listener = sync.bind().await?;
        let http_listener = TcpListener::bind(&config.http_addr).await?;
        log::info!("Execution backend: {}", proxy.endpoint());

        Ok(Self {
            sync,
            sync_listener,
            http_listener,
            api_state: ApiState { proxy },
        })
    }

    pub fn sync_addr(&self) -> std::io::Result<SocketAddr> {
        self.sync_listener.local_addr()
    }

    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        self.sync.store()
    }

    /// Serve until either listener fails.
    pub async fn serve(self) -> Result<(), BoxError> {
        let Self {
            sync,
            sync_listener,
            http_listener,
            api_state,
        } = self;

        tokio::select! {
            res = sync.serve(sync_listener) => res,
            res = api::serve(http_listener, api_state) => res.map_err(Into::into),
        }
    }
}

/// Bind everything described by `config` and serve.
pub async fn run(config: Config) -> Result<(), BoxError> {
    App::bind(&config).await?.serve().await
}
