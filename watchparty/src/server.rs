//! Server lifecycle management
//!
//! Builds the HTTP router, spawns the heartbeat ticker, and serves until
//! the process is stopped.

use std::sync::Arc;

use tracing::{error, info};

use watchparty_api::http::CommentsProxy;
use watchparty_api::{create_router, heartbeat, AppState, ConnectionHub, Dispatcher};
use watchparty_core::service::RoomRegistry;
use watchparty_core::Config;

pub struct WatchPartyServer {
    config: Arc<Config>,
    registry: Arc<RoomRegistry>,
    hub: Arc<ConnectionHub>,
    dispatcher: Arc<Dispatcher>,
}

impl WatchPartyServer {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        registry: Arc<RoomRegistry>,
        hub: Arc<ConnectionHub>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            config,
            registry,
            hub,
            dispatcher,
        }
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let comments = Arc::new(CommentsProxy::new(&self.config.comments));

        let state = AppState {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            hub: Arc::clone(&self.hub),
            dispatcher: self.dispatcher,
            comments,
        };
        let router = create_router(state);

        let heartbeat_handle = heartbeat::spawn(Arc::clone(&self.registry), Arc::clone(&self.hub));

        let http_address = self.config.http_address();
        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {http_address}: {e}"))?;
        info!("HTTP server listening on {http_address}");

        let result = axum::serve(listener, router).await;
        heartbeat_handle.abort();
        if let Err(e) = result {
            error!("HTTP server error: {e}");
            return Err(e.into());
        }
        Ok(())
    }
}
