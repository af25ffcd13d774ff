//! URL utilities for playlist ids and video links

use crate::error::YplError;
use url::Url;

/// Base of the links printed for each video
pub const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Extract a playlist id from a raw id or from any URL carrying a `list` parameter
pub fn extract_playlist_id(input: &str) -> Result<String, YplError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(YplError::InvalidPlaylistId("empty playlist id".to_string()));
    }

    // Accept raw playlist IDs as-is
    if is_valid_playlist_id(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)?;
    match parsed
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.to_string())
    {
        Some(id) if is_valid_playlist_id(&id) => Ok(id),
        Some(id) => Err(YplError::InvalidPlaylistId(id)),
        None => Err(YplError::InvalidPlaylistId(format!(
            "no list parameter in {}",
            input
        ))),
    }
}

/// Playlist ids are non-empty runs of URL-safe base64 characters
pub fn is_valid_playlist_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Watch link for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("{}?v={}", WATCH_URL, video_id)
}
