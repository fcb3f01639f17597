use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default document API URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Client configuration: [`AppConfig`] plus device-local settings.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    api_key: Option<String>,
    db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                server_url: Some(DEFAULT_SERVER_URL.to_string()),
                ..AppConfig::default()
            },
            api_key: None,
            db_path: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `MINGLE_*` environment variables, falling back to defaults for
    /// anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder().server_url(
            std::env::var("MINGLE_API_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string()),
        );

        if let Some(retries) = env_parse::<u32>("MINGLE_MAX_RETRIES")? {
            builder = builder.max_retries(retries);
        }
        if let Some(ms) = env_parse::<u64>("MINGLE_BASE_DELAY_MS")? {
            builder = builder.base_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = env_parse::<u64>("MINGLE_POLL_INTERVAL_SECS")? {
            builder = builder.poll_interval(Duration::from_secs(secs));
        }
        if let Some(capacity) = env_parse::<usize>("MINGLE_QUEUE_CAPACITY")? {
            builder = builder.queue_capacity(capacity);
        }
        if let Some(attempts) = env_parse::<u32>("MINGLE_QUEUE_MAX_ATTEMPTS")? {
            builder = builder.queue_max_attempts(attempts);
        }
        if let Some(ms) = env_parse::<u64>("MINGLE_SETTLE_DELAY_MS")? {
            builder = builder.settle_delay(Duration::from_millis(ms));
        }

        let mut config = Self::with_builder(builder)?;
        config.api_key = std::env::var("MINGLE_API_KEY").ok().filter(|key| !key.is_empty());
        config.db_path = std::env::var_os("MINGLE_DB_PATH").map(PathBuf::from);
        Ok(config)
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let mut app = builder.build()?;
        if app.server_url.is_none() {
            app.server_url = Some(DEFAULT_SERVER_URL.to_string());
        }
        Ok(Self {
            app,
            api_key: None,
            db_path: None,
        })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Bearer token for the document API, if configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key;
    }

    /// Explicit local database path; `None` means the platform data dir
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    pub fn set_db_path(&mut self, path: Option<PathBuf>) {
        self.db_path = path;
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}
