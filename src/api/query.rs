//! Paged query abstraction over the playlist endpoint

use crate::api::types::PLAYLIST_ITEM_FIELDS;
use crate::auth::Credential;
use crate::error::YplError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Parameters of a playlist enumeration, shared by all its pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistQuery {
    pub playlist_id: String,
    pub page_size: u32,
    /// Field mask sent as `fields`
    pub fields: String,
}

impl PlaylistQuery {
    pub fn new(playlist_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            playlist_id: playlist_id.into(),
            page_size,
            fields: PLAYLIST_ITEM_FIELDS.to_string(),
        }
    }
}

/// Continuation of a query: the server's page token plus the query it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    pub token: String,
    #[serde(skip)]
    pub query: Arc<PlaylistQuery>,
}

impl PageCursor {
    pub fn new(token: impl Into<String>, query: Arc<PlaylistQuery>) -> Self {
        Self {
            token: token.into(),
            query,
        }
    }
}

/// One playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    /// Playlist entry id
    pub id: String,
    /// Referenced video id
    pub video_id: String,
}

impl PlaylistItem {
    pub fn new(id: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            video_id: video_id.into(),
        }
    }
}

/// One page of results, in server order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<PlaylistItem>,
    /// `None` on the last page
    pub next_cursor: Option<PageCursor>,
}

impl Page {
    pub fn new(items: Vec<PlaylistItem>, next_cursor: Option<PageCursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn video_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.video_id.as_str())
    }
}

/// A backend able to serve playlist pages
#[async_trait]
pub trait PagedQuery: Send + Sync {
    /// Fetch the first page of `query`
    async fn fetch_first(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
    ) -> Result<Page, YplError>;

    /// Fetch the page `cursor` points at
    async fn fetch_next(&self, credential: &Credential, cursor: &PageCursor)
        -> Result<Page, YplError>;
}

#[async_trait]
impl<T: PagedQuery + ?Sized> PagedQuery for Arc<T> {
    async fn fetch_first(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
    ) -> Result<Page, YplError> {
        (**self).fetch_first(credential, query).await
    }

    async fn fetch_next(
        &self,
        credential: &Credential,
        cursor: &PageCursor,
    ) -> Result<Page, YplError> {
        (**self).fetch_next(credential, cursor).await
    }
}
