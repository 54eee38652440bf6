//! Health check endpoint
//!
//! Reports room/user counts alongside process uptime for monitoring
//! probes.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use watchparty_core::SERVER_START_TIME;

use super::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.registry.room_count(),
        "users": state.registry.user_count(),
        "uptime": SERVER_START_TIME.elapsed().as_secs(),
    }))
}
