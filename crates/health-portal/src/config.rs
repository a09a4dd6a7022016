//! Portal client configuration
//!
//! Defaults suit local development. [`PortalConfig::load`] layers an optional
//! file and `PORTAL_*` environment variables on top.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default base URL of the remote portal API (local development)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Delay before routing to login after a successful registration
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 2000;

/// Runtime configuration of the portal client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory holding the durable local cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,

    /// Client-side request timeout; unset or zero leaves the HTTP client default
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".portal-cache")
}

fn default_redirect_delay_ms() -> u64 {
    DEFAULT_REDIRECT_DELAY_MS
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            api_base_url: default_api_base_url(),
            cache_dir: default_cache_dir(),
            redirect_delay_ms: default_redirect_delay_ms(),
            request_timeout_ms: None,
        }
    }
}

impl PortalConfig {
    /// Loads the configuration from `PORTAL_*` environment variables and,
    /// when `PORTAL_CONFIG_FILE` is set, from that file.
    pub fn load() -> Result<Self> {
        let mut cfg = config::Config::builder();

        if let Ok(file) = std::env::var("PORTAL_CONFIG_FILE") {
            cfg = cfg.add_source(config::File::with_name(&file));
        }

        // environment wins over the file
        let cfg = cfg
            .add_source(config::Environment::with_prefix("PORTAL"))
            .build()?
            .try_deserialize::<Self>()?;

        Ok(cfg)
    }

    /// Set the API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the post-registration redirect delay
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set a client-side request timeout, kept at millisecond precision
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    #[inline]
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    #[inline]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
