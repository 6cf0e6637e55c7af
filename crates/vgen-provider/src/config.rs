//! Provider client configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{ProviderError, ProviderResult};

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";
pub const DEFAULT_MODEL: &str = "minimax/video-01";

/// Configuration for [`crate::ProviderClient`].
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer token. Checked on every call, never logged.
    pub api_token: Option<String>,
    pub base_url: String,
    /// Model identifier, `owner/name`.
    pub model: String,
    /// Clip length requested from the provider, in seconds.
    pub duration: u32,
    pub poll_interval: Duration,
    /// Per-request timeout. The overall generation deadline is the caller's.
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            duration: 5,
            poll_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(8),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("duration", &self.duration)
            .field("poll_interval", &self.poll_interval)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_token: std::env::var("VIDEO_PROVIDER_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            base_url: std::env::var("VIDEO_PROVIDER_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("VIDEO_PROVIDER_MODEL").unwrap_or(defaults.model),
            duration: std::env::var("VIDEO_PROVIDER_DURATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.duration),
            poll_interval: std::env::var("VIDEO_PROVIDER_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            request_timeout: std::env::var("VIDEO_PROVIDER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: std::env::var("VIDEO_PROVIDER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: defaults.retry_base_delay,
            retry_max_delay: defaults.retry_max_delay,
        }
    }

    /// The token, or a configuration error if none is set.
    pub fn require_token(&self) -> ProviderResult<&str> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::Configuration("VIDEO_PROVIDER_API_TOKEN is not set".to_string()))
    }

    /// Parsed base URL without a trailing slash.
    pub fn base(&self) -> ProviderResult<String> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Configuration(format!("invalid provider base URL: {}", e)))?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn predictions_url(&self) -> ProviderResult<String> {
        Ok(format!("{}/v1/models/{}/predictions", self.base()?, self.model))
    }

    pub fn prediction_url(&self, id: &str) -> ProviderResult<String> {
        Ok(format!("{}/v1/predictions/{}", self.base()?, id))
    }
}
