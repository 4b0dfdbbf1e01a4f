//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
/// Path prefix every automation endpoint lives under.
pub const API_PREFIX: &str = "/automation-api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
pub const USER_AGENT: &str = concat!("automation-client/", env!("CARGO_PKG_VERSION"));

/// GET response cache settings. Disabled unless asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Where the service lives and whose data the client reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    user_id: String,
    pub timeout: Duration,
    pub cache: CacheConfig,
}

impl ClientConfig {
    pub fn new(base_url: &str, user_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache: CacheConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Base URL joined with the automation prefix.
    pub fn api_root(&self) -> String {
        format!("{}{}", self.base_url, API_PREFIX)
    }

    /// Headers attached to every request.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("user-agent".to_string(), USER_AGENT.to_string()),
        ]
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.is_empty() {
            return Err(ApiError::InvalidConfig("base URL is required".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        if self.user_id.trim().is_empty() {
            return Err(ApiError::InvalidConfig("user id is required".into()));
        }
        if self.timeout < Duration::from_secs(1) {
            return Err(ApiError::InvalidConfig(
                "timeout must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "")
    }
}
