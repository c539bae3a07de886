//! Codeshare server: shared code buffer with remote execution.
//!
//! Configure with `CODESHARE_*` environment variables (see [`Config`]) and
//! `RUST_LOG` for log verbosity.

use codeshare_server::Config;
use log::{error, info};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting codeshare server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };
    info!(
        "Sync channel on {}, HTTP API on {}",
        config.sync.bind_addr, config.http_addr
    );

    if let Err(e) = codeshare_server::run(config).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
