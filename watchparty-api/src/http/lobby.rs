//! Public lobby listing of visible rooms

use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::AppState;

pub async fn rooms(State(state): State<AppState>) -> Json<Value> {
    if !state.config.lobby.enabled {
        return Json(json!({ "enabled": false, "rooms": [] }));
    }

    let listing = state.registry.enumerate_visible().await;
    Json(json!({ "enabled": true, "rooms": listing }))
}
