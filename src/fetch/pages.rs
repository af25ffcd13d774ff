//! Page-by-page traversal of a playlist query

use crate::api::{Page, PageCursor, PagedQuery, PlaylistQuery};
use crate::auth::Credential;
use crate::error::YplError;
use crate::fetch::retry::{RetryConfig, RetryExecutor};
use async_stream::try_stream;
use futures::Stream;
use std::sync::Arc;
use tracing::debug;

enum FetchState {
    First(Arc<PlaylistQuery>),
    Next(PageCursor),
    Done,
}

/// Pulls one page at a time, retrying each page under its own budget.
///
/// Once the last page was returned or a fetch failed, every further call
/// yields `Ok(None)`.
pub struct PageFetcher<'a, Q: ?Sized> {
    backend: &'a Q,
    credential: &'a Credential,
    retry: RetryExecutor,
    state: FetchState,
    pages: usize,
}

impl<'a, Q> PageFetcher<'a, Q>
where
    Q: PagedQuery + ?Sized,
{
    pub fn new(
        backend: &'a Q,
        credential: &'a Credential,
        query: PlaylistQuery,
        retry: RetryConfig,
    ) -> Self {
        Self {
            backend,
            credential,
            retry: RetryExecutor::with_config(retry),
            state: FetchState::First(Arc::new(query)),
            pages: 0,
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, FetchState::Done)
    }

    /// Fetch the next page, `Ok(None)` at the end of the playlist
    pub async fn next_page(&mut self) -> Result<Option<Page>, YplError> {
        let backend = self.backend;
        let credential = self.credential;

        let page = match std::mem::replace(&mut self.state, FetchState::Done) {
            FetchState::Done => return Ok(None),
            FetchState::First(query) => {
                self.retry
                    .execute(|| backend.fetch_first(credential, &query))
                    .await?
            }
            FetchState::Next(cursor) => {
                self.retry
                    .execute(|| backend.fetch_next(credential, &cursor))
                    .await?
            }
        };

        self.pages += 1;
        if let Some(cursor) = &page.next_cursor {
            self.state = FetchState::Next(cursor.clone());
        } else {
            debug!("Last page reached after {} page(s)", self.pages);
        }
        Ok(Some(page))
    }
}

/// Lazy sequence of the pages of `playlist_id`.
///
/// Nothing is requested until the stream is polled, and the next page is
/// only requested once the consumer asks for it.
pub fn fetch_pages<'a, Q>(
    backend: &'a Q,
    credential: &'a Credential,
    playlist_id: &str,
    page_size: u32,
    retry: RetryConfig,
) -> impl Stream<Item = Result<Page, YplError>> + 'a
where
    Q: PagedQuery + ?Sized,
{
    let query = PlaylistQuery::new(playlist_id, page_size);
    try_stream! {
        let mut fetcher = PageFetcher::new(backend, credential, query, retry);
        while let Some(page) = fetcher.next_page().await? {
            yield page;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PlaylistItem;
    use async_trait::async_trait;
    use futures::{pin_mut, StreamExt};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves a scripted sequence of results, recording every call
    struct Scripted {
        results: Mutex<VecDeque<Result<Vec<&'static str>, u16>>>,
        calls: Mutex<Vec<Option<String>>>,
    }

    impl Scripted {
        fn new(results: Vec<Result<Vec<&'static str>, u16>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn serve(
            &self,
            token: Option<String>,
            query: &Arc<PlaylistQuery>,
        ) -> Result<Page, YplError> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(token);
                calls.len()
            };
            let mut results = self.results.lock().unwrap();
            let ids = results
                .pop_front()
                .expect("unexpected fetch")
                .map_err(|status| YplError::fetch(Some(status), "scripted failure"))?;
            let items = ids
                .into_iter()
                .map(|id| PlaylistItem::new(format!("item-{id}"), id))
                .collect();
            let cursor = (!results.is_empty())
                .then(|| PageCursor::new(format!("page{}", n + 1), Arc::clone(query)));
            Ok(Page::new(items, cursor))
        }
    }

    #[async_trait]
    impl PagedQuery for Scripted {
        async fn fetch_first(
            &self,
            _credential: &Credential,
            query: &Arc<PlaylistQuery>,
        ) -> Result<Page, YplError> {
            self.serve(None, query)
        }

        async fn fetch_next(
            &self,
            _credential: &Credential,
            cursor: &PageCursor,
        ) -> Result<Page, YplError> {
            self.serve(Some(cursor.token.clone()), &cursor.query)
        }
    }

    fn retry_policy() -> RetryConfig {
        RetryConfig::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_walks_all_pages_in_order() {
        let backend = Scripted::new(vec![Ok(vec!["a", "b"]), Ok(vec!["c"]), Ok(vec![])]);
        let credential = Credential::new("token");
        let mut fetcher = PageFetcher::new(
            &backend,
            &credential,
            PlaylistQuery::new("PL", 2),
            retry_policy(),
        );

        let mut ids = Vec::new();
        while let Some(page) = fetcher.next_page().await.unwrap() {
            ids.extend(page.video_ids().map(str::to_string));
        }

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(fetcher.pages_fetched(), 3);
        assert!(fetcher.is_done());
        assert_eq!(
            backend.calls(),
            vec![None, Some("page2".to_string()), Some("page3".to_string())]
        );
        assert!(fetcher.next_page().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_same_page() {
        let backend = Scripted::new(vec![
            Ok(vec!["a"]),
            Err(500),
            Err(503),
            Ok(vec!["b"]),
        ]);
        let credential = Credential::new("token");
        let mut fetcher = PageFetcher::new(
            &backend,
            &credential,
            PlaylistQuery::new("PL", 1),
            retry_policy(),
        );

        fetcher.next_page().await.unwrap().unwrap();
        let page = fetcher.next_page().await.unwrap().unwrap();
        assert_eq!(page.video_ids().collect::<Vec<_>>(), vec!["b"]);

        // all three attempts asked for the same page
        let calls = backend.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[1..].iter().all(|c| c == &calls[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_per_page() {
        let backend = Scripted::new(vec![
            Err(403),
            Err(403),
            Ok(vec!["a"]),
            Err(500),
            Err(500),
            Ok(vec!["b"]),
        ]);
        let credential = Credential::new("token");

        let pages: Vec<_> = fetch_pages(&backend, &credential, "PL", 1, retry_policy())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.is_ok()));
        assert_eq!(backend.calls().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_ends_sequence() {
        let backend = Scripted::new(vec![Ok(vec!["a"]), Err(500), Err(500), Err(500), Ok(vec![])]);
        let credential = Credential::new("token");

        let stream = fetch_pages(&backend, &credential, "PL", 1, retry_policy());
        pin_mut!(stream);

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(stream.next().await.is_none());
        assert_eq!(backend.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_fetched_until_polled() {
        let backend = Scripted::new(vec![Ok(vec!["a"]), Ok(vec!["b"])]);
        let credential = Credential::new("token");

        let stream = fetch_pages(&backend, &credential, "PL", 1, retry_policy());
        pin_mut!(stream);
        assert!(backend.calls().is_empty());

        stream.next().await.unwrap().unwrap();
        assert_eq!(backend.calls().len(), 1);
    }
}
