mod server;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use watchparty_api::{ConnectionHub, Dispatcher};
use watchparty_core::service::RoomRegistry;
use watchparty_core::{logging, Config};
use watchparty_sfu::{SfuConfig, SfuManager};

use server::WatchPartyServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config_file = std::env::args().nth(1);
    let config = Config::load(config_file.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 1.5. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("WatchParty server starting...");
    info!("HTTP address: {}", config.http_address());

    let config = Arc::new(config);

    // 3. Spawn the SFU worker pool
    let listen_ip = config
        .media
        .listen_ip
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid media.listen_ip: {e}"))?;
    let sfu = SfuManager::new(SfuConfig {
        num_workers: config.media.num_workers,
        listen_ip,
        announced_ip: config.media.announced_ip.clone(),
        port: config.media.port,
        initial_available_outgoing_bitrate: config.media.initial_available_outgoing_bitrate,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to start SFU workers: {e}"))?;
    info!(workers = config.media.num_workers, "SFU worker pool ready");

    // 4. Wire up services
    let registry = Arc::new(RoomRegistry::new());
    let hub = Arc::new(ConnectionHub::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&hub),
        sfu,
        Arc::clone(&config),
    ));

    // 5. Start the server (HTTP + WebSocket + heartbeat ticker)
    let server = WatchPartyServer::new(config, registry, hub, dispatcher);
    server.start().await
}
