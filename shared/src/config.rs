//! Configuration management for the designer client.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base address of the design service, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DESIGNER_API_BASE_URL") {
            config = config.with_base_url(&url)?;
        }
        if let Some(raw) = lookup("DESIGNER_REQUEST_TIMEOUT_SECS") {
            let secs = parse_timeout(&raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Replace the base URL after normalizing it.
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        self.base_url = normalize_base_url(url)?;
        Ok(self)
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(Error::Config("request timeout must be positive".to_string()));
        }
        self.request_timeout = Duration::from_secs(secs);
        Ok(self)
    }

    /// Absolute URL for an endpoint path such as `/list_designs`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "base URL must start with http:// or https://, got {:?}",
            url
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_timeout(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(Error::Config(format!(
            "DESIGNER_REQUEST_TIMEOUT_SECS must be a positive integer, got {:?}",
            raw
        ))),
    }
}
