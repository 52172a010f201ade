//! Crash Round Server
//!
//! Runs crash rounds back to back and serves players over WebSocket.

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crash_round::{CrashServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env().context("Failed to load server configuration")?;

    info!("Crash Round Server v{}", VERSION);
    info!(
        "Tick: {:?}, growth rate: {}, intermission: {:?}, client seed policy: {:?}",
        config.engine.tick_interval,
        config.engine.growth_rate,
        config.intermission,
        config.engine.client_seed_policy
    );

    let server = CrashServer::new(config);
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                let _ = shutdown.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await.context("Server failed")?;

    info!("Server stopped");
    Ok(())
}
