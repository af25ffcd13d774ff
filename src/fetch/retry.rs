//! Retry logic for page fetches

use crate::error::YplError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Statuses treated as transient: forbidden/rate-limited, internal error, unavailable
pub const RETRYABLE_STATUSES: [u16; 3] = [403, 500, 503];

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries per page (the first attempt is not counted)
    pub max_retries: u32,
    /// Fixed wait before every retry
    pub delay: Duration,
    /// Remote statuses that are worth another attempt
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(5),
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    /// Check if error belongs to a transient failure class
    pub fn is_retryable(&self, error: &YplError) -> bool {
        error
            .status()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }
}

/// Retry executor.
///
/// Every call to [`RetryExecutor::execute`] starts with a full budget, so a
/// page that fails transiently gets its retries no matter how many pages
/// came before it.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new() -> Self {
        Self::with_config(RetryConfig::default())
    }

    /// Create a new retry executor with configuration
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, YplError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, YplError>>,
    {
        let mut budget = self.config.max_retries;
        let delay = self.config.delay;

        loop {
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => error,
            };

            if !self.config.is_retryable(&error) {
                debug!("Non-retryable failure: {}", error);
                return Err(error);
            }

            if budget == 0 {
                warn!("Retry budget exhausted: {}", error);
                return Err(error);
            }

            budget -= 1;
            warn!(
                "Transient failure ({}), retrying in {:?} ({} retries left)",
                error, delay, budget
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry configuration builder
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Create a new retry configuration builder
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set maximum retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the wait before every retry
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Set retryable statuses
    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.config.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Build the retry configuration
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
