//! OAuth credential and its validity rules

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credentials are treated as expired this long before their recorded expiry
pub const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Access/refresh token bundle proving authorization to call the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token sent with every API request
    pub access_token: String,
    /// Token used to mint a new access token without user interaction
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token stops being accepted
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted with this credential
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Create a credential from an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            scopes: Vec::new(),
        }
    }

    /// Set refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set absolute expiry
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set expiry relative to now
    pub fn expiring_in(self, lifetime: Duration) -> Self {
        let lifetime =
            ChronoDuration::from_std(lifetime).unwrap_or_else(|_| ChronoDuration::days(36_500));
        self.with_expires_at(Utc::now() + lifetime)
    }

    /// Set granted scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant, honouring [`EXPIRY_SKEW`]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                now + ChronoDuration::seconds(EXPIRY_SKEW.as_secs() as i64) >= expires_at
            }
            None => false,
        }
    }

    /// Token present and not expired
    pub fn is_valid(&self) -> bool {
        self.has_access_token() && !self.is_expired()
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Expired but otherwise well-formed and refreshable
    pub fn needs_refresh(&self) -> bool {
        self.has_access_token() && self.is_expired() && self.can_refresh()
    }
}
