//! Application configuration module
//!
//! Platform-agnostic tuning knobs for the data-access layer. The client-side
//! [`Config`](crate::client::Config) wraps this with environment loading.

use std::time::Duration;
use thiserror::Error;

/// Default number of attempts the retry executor makes per remote call
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay of the exponential backoff
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
/// Default upper bound of the random jitter added to each backoff delay
pub const DEFAULT_MAX_JITTER_MS: u64 = 1_000;
/// Default discovery polling interval
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Default number of operations the offline queue holds before dropping the oldest
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;
/// Default number of replays a queued operation gets before it is dropped
pub const DEFAULT_QUEUE_MAX_ATTEMPTS: u32 = 5;
/// Default pause between connectivity returning and the queue being drained
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the remote document API
    pub server_url: Option<String>,
    /// Attempts per remote call
    pub max_retries: u32,
    /// Backoff base delay
    pub base_delay: Duration,
    /// Backoff jitter upper bound
    pub max_jitter: Duration,
    /// Discovery polling interval
    pub poll_interval: Duration,
    /// Offline queue capacity
    pub queue_capacity: usize,
    /// Replays per queued operation
    pub queue_max_attempts: u32,
    /// Delay between reconnect and queue processing
    pub settle_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_jitter: Duration::from_millis(DEFAULT_MAX_JITTER_MS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_max_attempts: DEFAULT_QUEUE_MAX_ATTEMPTS,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue("max_retries", "must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue("poll_interval", "must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("queue_capacity", "must be at least 1".into()));
        }
        if self.queue_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_max_attempts",
                "must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: String) -> Self {
        self.config.server_url = Some(url);
        self
    }

    /// Set the number of attempts per remote call
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the backoff base delay
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Set the backoff jitter upper bound
    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.config.max_jitter = jitter;
        self
    }

    /// Set the discovery polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the offline queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the per-operation replay cap of the offline queue
    pub fn queue_max_attempts(mut self, attempts: u32) -> Self {
        self.config.queue_max_attempts = attempts;
        self
    }

    /// Set the reconnect settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
