//! # ypl - YouTube playlist lister
//!
//! Lists the videos of a YouTube playlist through the YouTube Data API v3.
//!
//! ## Features
//!
//! - OAuth2 consent via loopback redirect or pasted code, with a cached,
//!   auto-refreshed credential
//! - Lazy page-by-page enumeration, no fetch-ahead
//! - Per-page retry of transient failures
//! - Duplicate filtering in first-seen order
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::{pin_mut, StreamExt};
//! use ypl::auth::{Authenticator, ClientSecrets, FileCredentialStore, OAuthConsentFlow};
//! use ypl::{Config, Enumerator, YouTubeClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover()?;
//!     let secrets = ClientSecrets::from_file(&config.client_secrets_path())?;
//!     let consent = OAuthConsentFlow::new(secrets, config.scopes.clone())?;
//!     let store = FileCredentialStore::new(config.token_path());
//!
//!     let mut enumerator = Enumerator::new(
//!         Authenticator::new(store, consent),
//!         YouTubeClient::new(&config)?,
//!     );
//!
//!     let videos = enumerator.enumerate("PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf", 50, false);
//!     pin_mut!(videos);
//!     while let Some(id) = videos.next().await {
//!         println!("{}", ypl::utils::watch_url(&id?));
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod fetch;
pub mod utils;

// Re-export main types
pub use api::{Page, PageCursor, PagedQuery, PlaylistItem, PlaylistQuery, YouTubeClient};
pub use auth::{Authenticator, ConsentFlow, ConsentMode, Credential, CredentialStore};
pub use config::Config;
pub use enumerate::Enumerator;
pub use error::YplError;
pub use fetch::{fetch_pages, PageFetcher, RetryConfig};

/// Result type alias for ypl operations
pub type Result<T> = std::result::Result<T, YplError>;
