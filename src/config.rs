//! Tracker configuration
//!
//! Starts from the compile-time defaults in `constants` and optionally
//! applies overrides from the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `COIN_TRACKER_REFRESH_INTERVAL_MS` | polling interval |
//! | `COIN_TRACKER_SEARCH_DEBOUNCE_MS` | search quiet period |
//! | `COIN_TRACKER_SOURCE` | `mock`, `coingecko` or `failover` |
//! | `COIN_TRACKER_VS_CURRENCY` | quote currency |
//! | `COIN_TRACKER_STORAGE_PATH` | preferences file |
//! | `COINGECKO_API_KEY` | demo API key |
//! | `COINGECKO_BASE_URL` | API root |

use crate::{
    constants::{
        COINGECKO_API_URL, DEFAULT_MOCK_SEED, DEFAULT_REFRESH_INTERVAL_MS,
        DEFAULT_SEARCH_DEBOUNCE_MS, DEFAULT_SKELETON_ITEM_COUNT, DEFAULT_VS_CURRENCY,
        REQUEST_TIMEOUT_SECS,
    },
    error::ConfigError,
    favorites::FavoritesPolicy,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_REFRESH_INTERVAL_MS: &str = "COIN_TRACKER_REFRESH_INTERVAL_MS";
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "COIN_TRACKER_SEARCH_DEBOUNCE_MS";
pub const ENV_SOURCE: &str = "COIN_TRACKER_SOURCE";
pub const ENV_VS_CURRENCY: &str = "COIN_TRACKER_VS_CURRENCY";
pub const ENV_STORAGE_PATH: &str = "COIN_TRACKER_STORAGE_PATH";
pub const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
pub const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";

/// Which market data source the tracker talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Mock,
    CoinGecko,
    /// CoinGecko, falling back to the mock source
    Failover,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Mock => "mock",
            SourceKind::CoinGecko => "coingecko",
            SourceKind::Failover => "failover",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(SourceKind::Mock),
            "coingecko" => Ok(SourceKind::CoinGecko),
            "failover" => Ok(SourceKind::Failover),
            other => Err(ConfigError::invalid(
                ENV_SOURCE,
                format!("unknown source '{}', expected mock, coingecko or failover", other),
            )),
        }
    }
}

/// Settings for a `CoinTracker`
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub refresh_interval: Duration,
    pub search_debounce_delay: Duration,
    /// Placeholder rows a list view shows while the first load runs
    pub skeleton_item_count: usize,
    pub vs_currency: String,
    pub source: SourceKind,
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub request_timeout: Duration,
    /// Preferences are not persisted when unset
    pub storage_path: Option<PathBuf>,
    pub favorites_policy: FavoritesPolicy,
    pub mock_seed: u64,
    pub mock_latency: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            search_debounce_delay: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            skeleton_item_count: DEFAULT_SKELETON_ITEM_COUNT,
            vs_currency: DEFAULT_VS_CURRENCY.to_string(),
            source: SourceKind::default(),
            coingecko_base_url: COINGECKO_API_URL.to_string(),
            coingecko_api_key: None,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            storage_path: None,
            favorites_policy: FavoritesPolicy::default(),
            mock_seed: DEFAULT_MOCK_SEED,
            mock_latency: Duration::ZERO,
        }
    }
}

impl TrackerConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_REFRESH_INTERVAL_MS) {
            config.refresh_interval = parse_millis(ENV_REFRESH_INTERVAL_MS, &value)?;
        }
        if let Some(value) = get(ENV_SEARCH_DEBOUNCE_MS) {
            config.search_debounce_delay = parse_millis(ENV_SEARCH_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = get(ENV_SOURCE) {
            config.source = value.parse()?;
        }
        if let Some(value) = get(ENV_VS_CURRENCY) {
            config.vs_currency = value.trim().to_lowercase();
        }
        if let Some(value) = get(ENV_STORAGE_PATH) {
            config.storage_path = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_COINGECKO_API_KEY) {
            config.coingecko_api_key = Some(value);
        }
        if let Some(value) = get(ENV_COINGECKO_BASE_URL) {
            config.coingecko_base_url = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the tracker cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::invalid(
                "refresh_interval",
                "must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "request_timeout",
                "must be greater than zero",
            ));
        }
        if self.vs_currency.trim().is_empty() {
            return Err(ConfigError::invalid("vs_currency", "must not be empty"));
        }
        if self.source != SourceKind::Mock && self.coingecko_base_url.trim().is_empty() {
            return Err(ConfigError::invalid(
                "coingecko_base_url",
                "must not be empty",
            ));
        }
        Ok(())
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce_delay = delay;
        self
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_vs_currency(mut self, vs_currency: impl Into<String>) -> Self {
        self.vs_currency = vs_currency.into();
        self
    }

    pub fn with_coingecko(mut self, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.coingecko_base_url = base_url.into();
        self.coingecko_api_key = api_key;
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_favorites_policy(mut self, policy: FavoritesPolicy) -> Self {
        self.favorites_policy = policy;
        self
    }

    pub fn with_mock(mut self, seed: u64, latency: Duration) -> Self {
        self.mock_seed = seed;
        self.mock_latency = latency;
        self
    }
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::invalid(key, format!("'{}' is not a number of milliseconds: {}", value, e)))
}
