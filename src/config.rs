//! Runtime configuration for the backend client
//!
//! Built once at startup and handed to [`crate::client::HttpBackend`] and
//! [`crate::client::ApiClient`]. Sources in priority order: CLI flags (see
//! `main.rs`), environment variables (optionally from a `.env` file), then
//! the defaults below.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_SNAPSHOT_CAP: u32 = 2000;

pub const ENV_API_URL: &str = "RISKMON_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "RISKMON_TIMEOUT_SECS";
pub const ENV_CACHE_TTL_SECS: &str = "RISKMON_CACHE_TTL_SECS";
pub const ENV_SNAPSHOT_CAP: &str = "RISKMON_SNAPSHOT_CAP";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
    #[error("API URL must not be empty")]
    EmptyApiUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the risk backend, without trailing slash
    pub api_url: String,
    /// Per-request timeout for backend calls
    pub timeout: Duration,
    /// How long a period's ranking snapshot is reused
    pub cache_ttl: Duration,
    /// Rows requested per ranking snapshot, independent of top-N
    pub snapshot_cap: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            snapshot_cap: DEFAULT_SNAPSHOT_CAP,
        }
    }
}

impl Config {
    /// Load from process environment, falling back to defaults per field
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a closure over a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            cfg = cfg.with_api_url(&url)?;
        }
        if let Some(secs) = parse_number(&lookup, ENV_TIMEOUT_SECS)? {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, ENV_CACHE_TTL_SECS)? {
            cfg.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(cap) = parse_number(&lookup, ENV_SNAPSHOT_CAP)? {
            cfg.snapshot_cap = u32::try_from(cap).map_err(|_| ConfigError::InvalidNumber {
                var: ENV_SNAPSHOT_CAP,
                value: cap.to_string(),
            })?;
        }

        Ok(cfg)
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(ConfigError::EmptyApiUrl);
        }
        self.api_url = url.to_string();
        Ok(self)
    }
}

fn parse_number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}
