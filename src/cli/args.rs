//! Command line argument parsing

use crate::config::{default_config_dir, Config, MAX_PAGE_SIZE};
use crate::error::YplError;
use crate::fetch::{RetryConfig, RetryConfigBuilder};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// YPL - Extract video URLs from YouTube playlists using the YouTube Data API
#[derive(Parser, Debug)]
#[command(name = "ypl", author, version, about, long_about = None)]
pub struct Args {
    /// Playlist ID, or any URL with a `list=` parameter
    #[arg(value_name = "ID")]
    pub id: String,

    /// Echo each fetched page and report filtered duplicates
    #[arg(short, long)]
    pub verbose: bool,

    /// Paste the authorization code on the console instead of using a browser redirect
    #[arg(long)]
    pub headless: bool,

    /// Items requested per page
    #[arg(long, value_name = "N", default_value_t = MAX_PAGE_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=MAX_PAGE_SIZE as i64))]
    pub page_size: u32,

    /// Retries per page for transient errors
    #[arg(long, default_value = "2")]
    pub retries: u32,

    /// Delay between retries (e.g., 5s, 500ms)
    #[arg(long, value_name = "DURATION", default_value = "5s")]
    pub retry_delay: humantime::Duration,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Directory holding client_secret.json and the credential cache
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get retry delay as Duration
    pub fn retry_delay_duration(&self) -> Duration {
        self.retry_delay.into()
    }

    /// Per-page retry policy
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfigBuilder::new()
            .max_retries(self.retries)
            .delay(self.retry_delay_duration())
            .build()
    }

    /// Build the run configuration, resolving the config directory unless given
    pub fn config(&self) -> Result<Config, YplError> {
        let dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => default_config_dir()?,
        };

        Config::new(dir)
            .with_page_size(self.page_size)
            .map(|config| {
                config
                    .with_timeout(self.timeout_duration())
                    .with_retry(self.retry_config())
            })
    }
}

// Implement Default for Args to make tests work
impl Default for Args {
    fn default() -> Self {
        Self {
            id: String::new(),
            verbose: false,
            headless: false,
            page_size: MAX_PAGE_SIZE,
            retries: 2,
            retry_delay: humantime::Duration::from(Duration::from_secs(5)),
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            config_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["ypl", "PL123"]).unwrap();
        assert_eq!(args.id, "PL123");
        assert!(!args.verbose);
        assert!(!args.headless);
        assert_eq!(args.page_size, 50);
        assert_eq!(args.retries, 2);
        assert_eq!(args.retry_delay_duration(), Duration::from_secs(5));
        assert_eq!(args.timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_all_flags() {
        let args = Args::try_parse_from([
            "ypl",
            "-v",
            "--headless",
            "--page-size",
            "20",
            "--retries",
            "4",
            "--retry-delay",
            "250ms",
            "--timeout",
            "1m",
            "--config-dir",
            "/tmp/ypl",
            "https://www.youtube.com/playlist?list=PL123",
        ])
        .unwrap();

        assert!(args.verbose);
        assert!(args.headless);
        assert_eq!(args.page_size, 20);
        assert_eq!(args.timeout_duration(), Duration::from_secs(60));
        assert_eq!(args.config_dir, Some(PathBuf::from("/tmp/ypl")));

        let retry = args.retry_config();
        assert_eq!(retry.max_retries, 4);
        assert_eq!(retry.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_id_is_required() {
        assert!(Args::try_parse_from(["ypl"]).is_err());
    }

    #[test]
    fn test_page_size_range() {
        assert!(Args::try_parse_from(["ypl", "--page-size", "0", "PL1"]).is_err());
        assert!(Args::try_parse_from(["ypl", "--page-size", "51", "PL1"]).is_err());
        assert!(Args::try_parse_from(["ypl", "--page-size", "1", "PL1"]).is_ok());
    }

    #[test]
    fn test_config_from_args() {
        let args = Args {
            id: "PL1".to_string(),
            page_size: 10,
            retries: 0,
            config_dir: Some(PathBuf::from("/etc/ypl")),
            ..Default::default()
        };

        let config = args.config().unwrap();
        assert_eq!(config.config_dir, PathBuf::from("/etc/ypl"));
        assert_eq!(config.page_size, 10);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_args_default_values() {
        let args = Args::default();
        assert_eq!(args.id, "");
        assert_eq!(args.page_size, 50);
        assert_eq!(args.retries, 2);
        assert_eq!(args.config_dir, None);
        assert!(!args.verbose);
        assert!(!args.headless);
    }
}
