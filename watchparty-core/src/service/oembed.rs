//! Best-effort YouTube title lookup via the public oEmbed endpoint.
//!
//! Queue items start out titled with the video ID; when this lookup
//! returns, a follow-up queue update carries the real title. Failures
//! leave the fallback title in place and never affect the room.

use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
}

/// Fetch the title for a YouTube video ID.
pub async fn youtube_title(client: &reqwest::Client, video_id: &str) -> Result<String> {
    let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
    let response = client
        .get(OEMBED_ENDPOINT)
        .query(&[("url", watch_url.as_str()), ("format", "json")])
        .timeout(LOOKUP_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::Upstream(format!("oEmbed request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Upstream(format!(
            "oEmbed returned status {}",
            response.status()
        )));
    }

    let body: OEmbedResponse = response
        .json()
        .await
        .map_err(|e| Error::Upstream(format!("oEmbed response unreadable: {e}")))?;

    Ok(body.title)
}
