//! Media URL classification
//!
//! Splits load/queue URLs into YouTube videos (by extracted 11-char ID)
//! and directly playable media files.

use crate::{Error, Result};

/// How a URL will be played back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Youtube { id: String },
    Direct,
}

const DIRECT_EXTENSIONS: [&str; 8] = ["mp4", "webm", "ogg", "mov", "mkv", "avi", "flv", "m3u8"];

const YOUTUBE_ID_LEN: usize = 11;

/// Classify a URL, rejecting anything that is neither a recognizable
/// YouTube link nor a direct media file.
pub fn classify(url: &str) -> Result<VideoSource> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(Error::InvalidInput(
            "URL must use http or https".to_string(),
        ));
    }

    if let Some(id) = extract_youtube_id(trimmed) {
        return Ok(VideoSource::Youtube { id });
    }

    if is_direct_url(trimmed) {
        return Ok(VideoSource::Direct);
    }

    Err(Error::InvalidInput(
        "URL is neither a YouTube link nor a direct video file".to_string(),
    ))
}

/// Extract the 11-character video ID from the common YouTube URL shapes.
#[must_use]
pub fn extract_youtube_id(url: &str) -> Option<String> {
    if !url.contains("youtube.com") && !url.contains("youtu.be") {
        return None;
    }

    const MARKERS: [&str; 6] = ["watch?v=", "&v=", "youtu.be/", "/embed/", "/shorts/", "/live/"];
    for marker in MARKERS {
        if let Some(pos) = url.find(marker) {
            let id: String = url[pos + marker.len()..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
                .take(YOUTUBE_ID_LEN)
                .collect();
            if id.len() == YOUTUBE_ID_LEN {
                return Some(id);
            }
        }
    }
    None
}

/// Direct playback when the path ends in a known media extension, or the
/// URL carries `.m3u8` ahead of a query suffix.
#[must_use]
pub fn is_direct_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if DIRECT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
    {
        return true;
    }
    url.to_ascii_lowercase().contains(".m3u8")
}

/// Last path segment of a URL, without query string. Used as a fallback
/// title for direct media.
#[must_use]
pub fn url_tail(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_watch_url() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_watch_url_with_extra_params() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?t=30&v=dQw4w9WgXcQ&list=PL1"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_short_url() {
        assert_eq!(
            extract_youtube_id("https://youtu.be/dQw4w9WgXcQ?t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_embed_and_shorts() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_non_youtube_hosts() {
        assert_eq!(extract_youtube_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
    }

    #[test]
    fn test_extract_rejects_short_ids() {
        assert_eq!(extract_youtube_id("https://youtu.be/short"), None);
    }

    #[test]
    fn test_direct_extensions() {
        assert!(is_direct_url("https://cdn.example.com/movie.mp4"));
        assert!(is_direct_url("https://cdn.example.com/movie.WebM"));
        assert!(is_direct_url("https://cdn.example.com/movie.mkv?token=abc"));
        assert!(!is_direct_url("https://cdn.example.com/page.html"));
    }

    #[test]
    fn test_m3u8_with_query_suffix() {
        assert!(is_direct_url("https://cdn.example.com/live.m3u8?sig=xyz"));
        assert!(is_direct_url("https://cdn.example.com/hls/index.m3u8/extra?x=1"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ").ok(),
            Some(VideoSource::Youtube {
                id: "dQw4w9WgXcQ".to_string()
            })
        );
        assert_eq!(
            classify("https://cdn.example.com/movie.mp4").ok(),
            Some(VideoSource::Direct)
        );
        assert!(classify("ftp://example.com/movie.mp4").is_err());
        assert!(classify("https://example.com/article").is_err());
    }

    #[test]
    fn test_url_tail() {
        assert_eq!(url_tail("https://cdn.example.com/a/b/movie.mp4?sig=1"), "movie.mp4");
        assert_eq!(url_tail("https://cdn.example.com/clip.webm"), "clip.webm");
    }
}
