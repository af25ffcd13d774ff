//! Run configuration and configuration directory resolution

use crate::error::YplError;
use crate::fetch::RetryConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Application name, used for the config directory and the token file
pub const APP_NAME: &str = "ypl";

/// Client secrets file expected inside the config directory
pub const CLIENT_SECRETS_FILE: &str = "client_secret.json";

/// Read-only access to the playlist catalog
pub const YOUTUBE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";

/// YouTube Data API v3 base URL
pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest page the playlistItems endpoint serves
pub const MAX_PAGE_SIZE: u32 = 50;

/// Immutable configuration shared by the authenticator and the API client
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the client secrets and the credential cache
    pub config_dir: PathBuf,
    /// Client secrets file name
    pub client_secrets_file: String,
    /// Credential cache file name
    pub token_file: String,
    /// Requested OAuth scopes
    pub scopes: Vec<String>,
    /// API base URL
    pub api_base_url: String,
    /// Items requested per page
    pub page_size: u32,
    /// HTTP timeout
    pub timeout: Duration,
    /// Per-page retry policy
    pub retry: RetryConfig,
}

impl Config {
    /// Create a configuration rooted at `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            client_secrets_file: CLIENT_SECRETS_FILE.to_string(),
            token_file: format!(".{}.token", APP_NAME),
            scopes: vec![YOUTUBE_READONLY_SCOPE.to_string()],
            api_base_url: API_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Create a configuration rooted at the per-user config directory
    pub fn discover() -> Result<Self, YplError> {
        Ok(Self::new(default_config_dir()?))
    }

    /// Set page size
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, YplError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(YplError::InvalidPageSize(page_size));
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Set HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn client_secrets_path(&self) -> PathBuf {
        self.config_dir.join(&self.client_secrets_file)
    }

    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join(&self.token_file)
    }

    /// Create the config directory, but not its parents, so the user knows
    /// where to drop the client secrets. Returns whether it was created.
    pub fn ensure_config_dir(&self) -> Result<bool, YplError> {
        if self.config_dir.is_dir() {
            return Ok(false);
        }
        std::fs::create_dir(&self.config_dir)?;
        info!("Created {}", self.config_dir.display());
        Ok(true)
    }
}

/// Resolve the per-user config directory from the process environment
pub fn default_config_dir() -> Result<PathBuf, YplError> {
    let home = directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(YplError::NoConfigDir)?;

    let env = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    Ok(resolve_config_dir(
        APP_NAME,
        cfg!(windows),
        env("XDG_CONFIG_HOME"),
        env("APPDATA"),
        &home,
    ))
}

/// Pick the config directory.
///
/// Windows uses `%APPDATA%/<app>`. Elsewhere `$XDG_CONFIG_HOME/<app>` wins,
/// then `~/.config/<app>` if `~/.config` exists. Both fall back to the
/// home directory itself.
pub fn resolve_config_dir(
    app: &str,
    windows: bool,
    xdg_config_home: Option<PathBuf>,
    appdata: Option<PathBuf>,
    home: &Path,
) -> PathBuf {
    if windows {
        return appdata
            .map(|dir| dir.join(app))
            .unwrap_or_else(|| home.to_path_buf());
    }

    if let Some(xdg) = xdg_config_home {
        return xdg.join(app);
    }

    let dot_config = home.join(".config");
    if dot_config.is_dir() {
        dot_config.join(app)
    } else {
        home.to_path_buf()
    }
}
