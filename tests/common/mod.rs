//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ypl::auth::{ConsentFlow, ConsentMode, Credential};
use ypl::{Page, PageCursor, PagedQuery, PlaylistItem, PlaylistQuery, YplError};

/// Consent flow that counts its invocations
#[derive(Default)]
pub struct CountingConsent {
    pub obtained: AtomicUsize,
    pub refreshed: AtomicUsize,
}

impl CountingConsent {
    pub fn obtained(&self) -> usize {
        self.obtained.load(Ordering::SeqCst)
    }

    pub fn refreshed(&self) -> usize {
        self.refreshed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentFlow for CountingConsent {
    async fn obtain(&self, _mode: ConsentMode) -> Result<Credential, YplError> {
        self.obtained.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::new("consented")
            .with_refresh_token("refresh")
            .expiring_in(Duration::from_secs(3600)))
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, YplError> {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            access_token: "refreshed".to_string(),
            expires_at: Some(Utc::now() + ChronoDuration::hours(1)),
            ..credential.clone()
        })
    }
}

pub fn valid_credential() -> Credential {
    Credential::new("cached")
        .with_refresh_token("refresh")
        .expiring_in(Duration::from_secs(3600))
}

pub fn expired_credential() -> Credential {
    Credential::new("stale")
        .with_refresh_token("refresh")
        .with_expires_at(Utc::now() - ChronoDuration::hours(1))
}

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub token: Option<String>,
    pub page_size: u32,
    pub access_token: String,
}

/// A playlist served in pages of the requested size, with optional
/// scripted failures injected before successful responses
pub struct FakePlaylist {
    video_ids: Vec<String>,
    failures: Mutex<VecDeque<u16>>,
    requests: Mutex<Vec<Request>>,
    served: Mutex<Vec<usize>>,
}

impl FakePlaylist {
    pub fn new(video_ids: Vec<String>) -> Self {
        Self {
            video_ids,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            served: Mutex::new(Vec::new()),
        }
    }

    /// Playlist of `n` distinct videos `vid000`, `vid001`, ...
    pub fn numbered(n: usize) -> Self {
        Self::new((0..n).map(|i| format!("vid{i:03}")).collect())
    }

    /// Answer the next requests with these statuses, in order
    pub fn fail_with(self, statuses: &[u16]) -> Self {
        self.failures.lock().unwrap().extend(statuses.iter().copied());
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Sizes of the pages successfully served
    pub fn served(&self) -> Vec<usize> {
        self.served.lock().unwrap().clone()
    }

    fn serve(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
        token: Option<&str>,
    ) -> Result<Page, YplError> {
        self.requests.lock().unwrap().push(Request {
            token: token.map(str::to_string),
            page_size: query.page_size,
            access_token: credential.access_token.clone(),
        });

        if let Some(status) = self.failures.lock().unwrap().pop_front() {
            return Err(YplError::fetch(Some(status), "injected failure"));
        }

        let start: usize = match token {
            None => 0,
            Some(token) => token
                .parse()
                .map_err(|_| YplError::fetch(Some(400), "invalid page token"))?,
        };
        let end = (start + query.page_size as usize).min(self.video_ids.len());

        let items: Vec<_> = self.video_ids[start..end]
            .iter()
            .enumerate()
            .map(|(i, id)| PlaylistItem::new(format!("entry{}", start + i), id.clone()))
            .collect();
        self.served.lock().unwrap().push(items.len());

        let next = (end < self.video_ids.len())
            .then(|| PageCursor::new(end.to_string(), Arc::clone(query)));
        Ok(Page::new(items, next))
    }
}

#[async_trait]
impl PagedQuery for FakePlaylist {
    async fn fetch_first(
        &self,
        credential: &Credential,
        query: &Arc<PlaylistQuery>,
    ) -> Result<Page, YplError> {
        self.serve(credential, query, None)
    }

    async fn fetch_next(
        &self,
        credential: &Credential,
        cursor: &PageCursor,
    ) -> Result<Page, YplError> {
        self.serve(credential, &cursor.query, Some(&cursor.token))
    }
}
