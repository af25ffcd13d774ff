//! Error types for ypl

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ypl operations
#[derive(Debug, Error)]
pub enum YplError {
    /// Consent flow failed or was cancelled
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Cached credential exists but cannot be read back
    #[error("Cached credential at {} is unreadable: {reason}", .path.display())]
    CorruptCredential { path: PathBuf, reason: String },

    /// Credential cache could not be written
    #[error("Failed to persist credential to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Page fetch failed (non-retryable, or retry budget exhausted)
    #[error(
        "Fetch failed{}: {message}",
        .status.map(|s| format!(" with status {s}")).unwrap_or_default()
    )]
    Fetch { status: Option<u16>, message: String },

    #[error("Client secrets file not found: {}", .0.display())]
    MissingClientSecrets(PathBuf),

    #[error("Invalid client secrets: {0}")]
    InvalidClientSecrets(String),

    #[error("Invalid playlist id: {0}")]
    InvalidPlaylistId(String),

    #[error("Invalid page size {0}: must be between 1 and 50")]
    InvalidPageSize(u32),

    #[error("Could not determine a configuration directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl YplError {
    /// Remote HTTP status carried by a fetch failure
    pub fn status(&self) -> Option<u16> {
        match self {
            YplError::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    /// Check if error must abort the run.
    ///
    /// A corrupt cache is recovered by re-authenticating and a failed cache
    /// write only costs the next run a new consent.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            YplError::CorruptCredential { .. } | YplError::Persistence { .. }
        )
    }

    /// Build a fetch failure
    pub fn fetch(status: Option<u16>, message: impl Into<String>) -> Self {
        YplError::Fetch {
            status,
            message: message.into(),
        }
    }
}
