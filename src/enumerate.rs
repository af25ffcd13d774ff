//! Deduplicating playlist enumeration

use crate::api::PagedQuery;
use crate::auth::{Authenticator, ConsentFlow, ConsentMode, CredentialStore};
use crate::error::YplError;
use crate::fetch::{fetch_pages, RetryConfig};
use async_stream::try_stream;
use futures::{pin_mut, Stream, StreamExt};
use std::collections::HashSet;
use std::io::{self, Write};
use tracing::{debug, info};

/// Turns a playlist into the distinct ids of its videos, in first-seen order
pub struct Enumerator<S, C, Q> {
    authenticator: Authenticator<S, C>,
    backend: Q,
    retry: RetryConfig,
    mode: ConsentMode,
    diagnostics: Box<dyn Write + Send>,
}

impl<S, C, Q> Enumerator<S, C, Q>
where
    S: CredentialStore,
    C: ConsentFlow,
    Q: PagedQuery,
{
    pub fn new(authenticator: Authenticator<S, C>, backend: Q) -> Self {
        Self {
            authenticator,
            backend,
            retry: RetryConfig::default(),
            mode: ConsentMode::Loopback,
            diagnostics: Box::new(io::stderr()),
        }
    }

    /// Set the per-page retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set how consent is obtained when no usable credential is cached
    pub fn with_consent_mode(mut self, mode: ConsentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Redirect verbose output, stderr by default
    pub fn with_diagnostics(mut self, diagnostics: impl Write + Send + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    pub fn authenticator(&self) -> &Authenticator<S, C> {
        &self.authenticator
    }

    pub fn backend(&self) -> &Q {
        &self.backend
    }

    /// Stream the distinct video ids of `playlist_id`.
    ///
    /// Authentication happens on first poll. Pages are fetched on demand,
    /// never ahead of the consumer. A failure ends the stream after every id
    /// of the pages fetched so far has been yielded.
    ///
    /// In verbose mode each page is echoed as JSON after entries without a
    /// video have been dropped, so the echo shows exactly the entries that
    /// feed deduplication. Each filtered duplicate is reported once.
    pub fn enumerate<'a>(
        &'a mut self,
        playlist_id: &str,
        page_size: u32,
        verbose: bool,
    ) -> impl Stream<Item = Result<String, YplError>> + 'a {
        let playlist_id = playlist_id.to_string();

        try_stream! {
            let credential = self.authenticator.authenticate(self.mode).await?;
            info!("Enumerating playlist {}", playlist_id);

            let pages = fetch_pages(
                &self.backend,
                &credential,
                &playlist_id,
                page_size,
                self.retry.clone(),
            );
            pin_mut!(pages);

            let mut seen = HashSet::new();
            while let Some(page) = pages.next().await {
                let page = page?;
                if verbose {
                    match serde_json::to_string_pretty(&page) {
                        Ok(dump) => report(&mut self.diagnostics, &dump),
                        Err(e) => debug!("Could not render page: {}", e),
                    }
                }

                for item in page.items {
                    if seen.insert(item.video_id.clone()) {
                        yield item.video_id;
                    } else if verbose {
                        report(
                            &mut self.diagnostics,
                            &format!("Duplicate filtered: {}", item.video_id),
                        );
                    } else {
                        debug!("Duplicate video {} in playlist entry {}", item.video_id, item.id);
                    }
                }
            }

            debug!("Playlist {} exhausted, {} distinct videos", playlist_id, seen.len());
        }
    }
}

fn report(out: &mut dyn Write, line: &str) {
    if let Err(e) = writeln!(out, "{}", line) {
        debug!("Could not write diagnostics: {}", e);
    }
}
