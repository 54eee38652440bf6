//! ICE server lookup
//!
//! Clients fetch this before screen-share peer connections: STUN
//! defaults always, TURN only when the config carries the full triple.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use super::AppState;

#[derive(Debug, Clone, Serialize)]
struct IceServer {
    urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credential: Option<String>,
}

pub async fn ice_servers(State(state): State<AppState>) -> Json<Value> {
    let turn = &state.config.turn;

    let mut servers = vec![IceServer {
        urls: turn.stun_servers.clone(),
        username: None,
        credential: None,
    }];

    if let (Some(url), Some(username), Some(credential)) =
        (&turn.url, &turn.username, &turn.credential)
    {
        servers.push(IceServer {
            urls: vec![url.clone()],
            username: Some(username.clone()),
            credential: Some(credential.clone()),
        });
    }

    Json(json!({ "iceServers": servers }))
}
