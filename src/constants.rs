//! Constants for the coin tracker
//!
//! Compile-time defaults live here. `TrackerConfig` starts from these
//! values and may override them from the environment.

/// Default polling interval for every resource (in milliseconds)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;

/// Quiet period before a typed search query is applied (in milliseconds)
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Number of placeholder rows a list view shows while loading
pub const DEFAULT_SKELETON_ITEM_COUNT: usize = 15;

/// Lower bound for the scheduler tick (in milliseconds)
pub const MIN_POLL_TICK_MS: u64 = 250;

/// HTTP request timeout when talking to a remote source (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Quote currency used when none is configured
pub const DEFAULT_VS_CURRENCY: &str = "usd";

/// Chart length requested when none is given (in days)
pub const DEFAULT_CHART_DAYS: u32 = 30;

/// Chart granularity requested from the source
pub const DEFAULT_CHART_INTERVAL: &str = "daily";

/// Capacity of the tracker event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying the CoinGecko demo API key
pub const COINGECKO_API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// How long a cached `/coins/markets` response is served (in seconds)
pub const COINS_CACHE_TTL_SECS: u64 = 60;

/// How long a cached `/coins/{id}` response is served (in seconds)
pub const DETAIL_CACHE_TTL_SECS: u64 = 60;

/// How long a cached `/coins/{id}/market_chart` response is served (in seconds)
pub const CHART_CACHE_TTL_SECS: u64 = 3_600;

/// Seed used by the mock source when none is configured
pub const DEFAULT_MOCK_SEED: u64 = 42;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "coin-tracker-sdk/0.1.0";

/// The coins listed by the tracker, in CoinGecko id form
pub const POPULAR_COINS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "tether",
    "usd-coin",
    "binancecoin",
    "ripple",
    "solana",
    "cardano",
    "dogecoin",
    "shiba-inu",
    "polkadot",
    "tron",
    "avalanche-2",
    "chainlink",
    "matic-network",
    "litecoin",
    "polygon",
    "wrapped-bitcoin",
    "uniswap",
    "ethereum-classic",
];
