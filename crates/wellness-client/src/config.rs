//! Configuration for the remote service client.

use std::time::Duration;

use vitals_core::config::{env_lookup, positive_var, string_var};
use vitals_core::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8787";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`WellnessApiClient`](crate::WellnessApiClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the remote services, without a trailing slash.
    pub api_url: String,

    /// Bearer token. Opaque; no header is sent when unset.
    pub api_token: Option<String>,

    /// Whole-request timeout applied by the HTTP client.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `WELLNESS_API_URL` - Base URL (default: http://127.0.0.1:8787)
    /// - `WELLNESS_API_TOKEN` - Bearer token (default: none)
    /// - `WELLNESS_API_TIMEOUT_SECS` - Request timeout (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let api_url = string_var(&lookup, "WELLNESS_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_url(&api_url)?;

        let api_token = string_var(&lookup, "WELLNESS_API_TOKEN");

        let timeout_secs = positive_var(&lookup, "WELLNESS_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            api_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Create a new config builder.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

/// Builder for ApiConfig.
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    /// Set the base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the bearer token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ApiConfig {
        self.config
    }
}

fn normalize_url(raw: &str) -> Result<String, ConfigError> {
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            name: "WELLNESS_API_URL".to_string(),
            value: raw.to_string(),
            reason: "expected an http:// or https:// URL".to_string(),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}
