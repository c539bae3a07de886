//! Process configuration: listening addresses and the execution backend.
//!
//! Defaults match a local development setup. Each field can be overridden
//! through an environment variable:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `CODESHARE_SYNC_ADDR` | sync WebSocket listener | `127.0.0.1:5001` |
//! | `CODESHARE_HTTP_ADDR` | HTTP API listener | `127.0.0.1:5000` |
//! | `CODESHARE_EXECUTION_ENDPOINT` | backend execute URL | public Piston |
//! | `CODESHARE_BROADCAST_CAPACITY` | per-participant update buffer | `256` |

use codeshare_collab::ServerConfig;
use codeshare_exec::DEFAULT_ENDPOINT;

pub const SYNC_ADDR_VAR: &str = "CODESHARE_SYNC_ADDR";
pub const HTTP_ADDR_VAR: &str = "CODESHARE_HTTP_ADDR";
pub const EXECUTION_ENDPOINT_VAR: &str = "CODESHARE_EXECUTION_ENDPOINT";
pub const BROADCAST_CAPACITY_VAR: &str = "CODESHARE_BROADCAST_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sync channel settings
    pub sync: ServerConfig,
    /// Address of the HTTP API (`POST /run`)
    pub http_addr: String,
    /// Execution backend URL
    pub execution_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: ServerConfig::default(),
            http_addr: "127.0.0.1:5000".to_string(),
            execution_endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(SYNC_ADDR_VAR) {
            config.sync.bind_addr = non_empty(SYNC_ADDR_VAR, addr)?;
        }
        if let Some(addr) = lookup(HTTP_ADDR_VAR) {
            config.http_addr = non_empty(HTTP_ADDR_VAR, addr)?;
        }
        if let Some(endpoint) = lookup(EXECUTION_ENDPOINT_VAR) {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    key: EXECUTION_ENDPOINT_VAR,
                    value: endpoint,
                    reason: "expected an http:// or https:// URL",
                });
            }
            config.execution_endpoint = endpoint;
        }
        if let Some(raw) = lookup(BROADCAST_CAPACITY_VAR) {
            config.sync.broadcast_capacity = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: BROADCAST_CAPACITY_VAR,
                        value: raw,
                        reason: "expected a positive integer",
                    })
                }
            };
        }

        Ok(config)
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "must not be empty",
        });
    }
    Ok(value)
}
