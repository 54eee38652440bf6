// Module: http
// HTTP surface: health, ICE server lookup, public lobby listing, the
// comments proxy, and the WebSocket upgrade route.

pub mod comments;
pub mod health;
pub mod ice;
pub mod lobby;

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use watchparty_core::service::RoomRegistry;
use watchparty_core::Config;

use crate::ws::connection::ws_handler;
use crate::ws::dispatcher::Dispatcher;
use crate::ws::hub::ConnectionHub;

pub use comments::CommentsProxy;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RoomRegistry>,
    pub hub: Arc<ConnectionHub>,
    pub dispatcher: Arc<Dispatcher>,
    pub comments: Arc<CommentsProxy>,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(health::health))
        .route("/ice-servers", get(ice::ice_servers))
        .route("/rooms", get(lobby::rooms))
        .route("/comments/:video_id", get(comments::comments))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(origin, "Invalid CORS origin, falling back to permissive");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
