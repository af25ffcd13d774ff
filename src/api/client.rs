//! HTTP client for the YouTube Data API v3

use crate::api::query::{Page, PageCursor, PagedQuery, PlaylistItem, PlaylistQuery};
use crate::api::types::{ErrorEnvelope, PlaylistItemListResponse};
use crate::auth::Credential;
use crate::config::Config;
use crate::error::YplError;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Playlist client backed by `reqwest`
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: String,
}

impl YouTubeClient {
    /// Create a client from the run configuration
    pub fn new(config: &Config) -> Result<Self, YplError> {
        Self::with_base_url(&config.api_base_url, config.timeout)
    }

    /// Create a client talking to `base_url`
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, YplError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| YplError::fetch(None, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_page(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
        page_token: Option<&str>,
    ) -> Result<Page, YplError> {
        let url = format!("{}/playlistItems", self.base_url);
        let max_results = query.page_size.to_string();

        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", query.playlist_id.as_str()),
            ("maxResults", max_results.as_str()),
            ("fields", query.fields.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        debug!(
            "Requesting playlist {} page {}",
            query.playlist_id,
            page_token.unwrap_or("<first>")
        );

        let response = self
            .client
            .get(&url)
            .query(&params)
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(|e| {
                YplError::fetch(e.status().map(|s| s.as_u16()), format!("Request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            YplError::fetch(Some(status.as_u16()), format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(YplError::fetch(
                Some(status.as_u16()),
                error_message(status, &body),
            ));
        }

        let raw: PlaylistItemListResponse = serde_json::from_str(&body)
            .map_err(|e| YplError::fetch(None, format!("Malformed playlist page: {}", e)))?;

        let mut items = Vec::with_capacity(raw.items.len());
        for resource in &raw.items {
            match resource.video_id() {
                Some(video_id) => items.push(PlaylistItem::new(&resource.id, video_id)),
                None => debug!("Skipping playlist entry {} without a video id", resource.id),
            }
        }

        let next_cursor = raw
            .next_page_token
            .filter(|token| !token.is_empty())
            .map(|token| PageCursor::new(token, Arc::clone(query)));

        debug!(
            "Received {} items, {}",
            items.len(),
            if next_cursor.is_some() { "more pages follow" } else { "last page" }
        );
        Ok(Page::new(items, next_cursor))
    }
}

#[async_trait]
impl PagedQuery for YouTubeClient {
    async fn fetch_first(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
    ) -> Result<Page, YplError> {
        self.fetch_page(credential, query, None).await
    }

    async fn fetch_next(
        &self,
        credential: &Credential,
        cursor: &PageCursor,
    ) -> Result<Page, YplError> {
        self.fetch_page(credential, &cursor.query, Some(&cursor.token))
            .await
    }
}

/// Best human-readable message for a failed response
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }

    let body = body.trim();
    if body.is_empty() {
        warn!("Empty error body with status {}", status);
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}
