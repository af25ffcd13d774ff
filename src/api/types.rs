//! Wire types for the `playlistItems.list` endpoint.

use serde::{Deserialize, Serialize};

/// Fields requested from the endpoint; everything else is stripped server-side
pub const PLAYLIST_ITEM_FIELDS: &str = "items(id,snippet(resourceId/videoId)),nextPageToken";

/// Response of `playlistItems.list`, restricted to [`PLAYLIST_ITEM_FIELDS`].
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/list>
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlaylistItemListResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItemResource>,
    /// Absent on the last page
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemResource {
    /// Id of the playlist entry, not of the video
    pub id: String,
    #[serde(default)]
    pub snippet: Option<PlaylistItemSnippet>,
}

impl PlaylistItemResource {
    /// Id of the referenced video, if the entry still points at one
    pub fn video_id(&self) -> Option<&str> {
        self.snippet
            .as_ref()
            .and_then(|s| s.resource_id.as_ref())
            .and_then(|r| r.video_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistItemSnippet {
    #[serde(rename = "resourceId", default)]
    pub resource_id: Option<ResourceId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "videoId", default)]
    pub video_id: Option<String>,
}

/// Google API error envelope: `{"error": {"code": 404, "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}
