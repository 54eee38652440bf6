//! Comments proxy
//!
//! Transparent pass-through to a rotating list of upstream Invidious
//! instances with a short in-memory cache. Upstream failures rotate to
//! the next instance; exhausting the list yields a 502. Nothing here can
//! affect a room.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use watchparty_core::config::CommentsConfig;
use watchparty_core::{Error, Result};

use super::AppState;

/// Cached upstream bodies, keyed by video ID + query parameters
const CACHE_CAPACITY: u64 = 1_000;

pub struct CommentsProxy {
    client: reqwest::Client,
    instances: Vec<String>,
    cursor: AtomicUsize,
    cache: Cache<String, Arc<String>>,
    request_timeout: Duration,
}

impl CommentsProxy {
    #[must_use]
    pub fn new(config: &CommentsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            instances: config.instances.clone(),
            cursor: AtomicUsize::new(0),
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
                .build(),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        }
    }

    /// Fetch comments for a video, serving from cache when fresh.
    pub async fn fetch(
        &self,
        video_id: &str,
        sort_by: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<Arc<String>> {
        let key = format!(
            "{video_id}|{}|{}",
            sort_by.unwrap_or_default(),
            continuation.unwrap_or_default()
        );
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        if self.instances.is_empty() {
            return Err(Error::Upstream("No comment sources configured".to_string()));
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for attempt in 0..self.instances.len() {
            let base = &self.instances[(start + attempt) % self.instances.len()];
            let url = format!("{base}/api/v1/comments/{video_id}");

            let mut request = self.client.get(&url).timeout(self.request_timeout);
            if let Some(sort_by) = sort_by {
                request = request.query(&[("sort_by", sort_by)]);
            }
            if let Some(continuation) = continuation {
                request = request.query(&[("continuation", continuation)]);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(body) => {
                        let body = Arc::new(body);
                        self.cache.insert(key, Arc::clone(&body)).await;
                        return Ok(body);
                    }
                    Err(e) => {
                        debug!(instance = base, error = %e, "Comment body unreadable");
                    }
                },
                Ok(response) => {
                    debug!(instance = base, status = %response.status(), "Comment source rejected request");
                }
                Err(e) => {
                    debug!(instance = base, error = %e, "Comment source unreachable");
                }
            }
        }

        warn!(video = video_id, "All comment sources failed");
        Err(Error::Upstream("All comment sources failed".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
    pub sort_by: Option<String>,
    pub continuation: Option<String>,
}

fn valid_video_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 16
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

pub async fn comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> Response {
    if !valid_video_id(&video_id) {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": "Invalid video id" })),
        )
            .into_response();
    }

    match state
        .comments
        .fetch(&video_id, query.sort_by.as_deref(), query.continuation.as_deref())
        .await
    {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.as_str().to_string(),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({ "error": e.client_message() })),
        )
            .into_response(),
    }
}
