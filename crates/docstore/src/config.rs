//! Connection and retry settings.

use std::time::Duration;

use crate::errors::{DocStoreError, Result};
use crate::retry::RetryConfig;

/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_URL: &str = "CLOUDANT_URL";
pub const ENV_ACCOUNT: &str = "CLOUDANT_USER";
pub const ENV_AUTH_TOKEN: &str = "CLOUDANT_AUTH_TOKEN";
pub const ENV_MAX_ATTEMPTS: &str = "DOCSTORE_MAX_ATTEMPTS";
pub const ENV_MAX_BACKOFF_MS: &str = "DOCSTORE_MAX_BACKOFF_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DOCSTORE_REQUEST_TIMEOUT_SECS";

/// Settings needed to reach the document database service.
#[derive(Clone)]
pub struct StoreConfig {
    /// Service endpoint, e.g. `https://<account>.cloudant.com`
    pub url: String,
    /// Service account identifier
    pub account: String,
    /// Authentication token paired with the account
    pub auth_token: String,
    /// Timeout applied to each HTTP request
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("account", &self.account)
            .field("auth_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl StoreConfig {
    /// Create a configuration with default timeout and retry settings.
    pub fn new(
        account: impl Into<String>,
        auth_token: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            account: account.into(),
            auth_token: auth_token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load the configuration from environment variables.
    ///
    /// `CLOUDANT_URL`, `CLOUDANT_USER` and `CLOUDANT_AUTH_TOKEN` are required.
    /// `DOCSTORE_MAX_ATTEMPTS`, `DOCSTORE_MAX_BACKOFF_MS` and
    /// `DOCSTORE_REQUEST_TIMEOUT_SECS` override the defaults when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DocStoreError::invalid_config(format!("{} is not set", key)))
        };

        let mut config = Self::new(
            required(ENV_ACCOUNT)?,
            required(ENV_AUTH_TOKEN)?,
            required(ENV_URL)?,
        );

        if let Some(attempts) = parse_optional::<u32, _>(&lookup, ENV_MAX_ATTEMPTS)? {
            config.retry.max_attempts = attempts;
        }
        if let Some(millis) = parse_optional::<u64, _>(&lookup, ENV_MAX_BACKOFF_MS)? {
            config.retry.max_backoff = Duration::from_millis(millis);
        }
        if let Some(secs) = parse_optional::<u64, _>(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
            if secs == 0 {
                return Err(DocStoreError::invalid_config(format!(
                    "{} must be greater than zero",
                    ENV_REQUEST_TIMEOUT_SECS
                )));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            DocStoreError::invalid_config(format!("{} has invalid value '{}': {}", key, raw, e))
        }),
        None => Ok(None),
    }
}
