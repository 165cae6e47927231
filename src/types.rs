//! Types for the coin tracker
//!
//! Wire types mirror the CoinGecko response shapes. Everything beyond the
//! identifying strings is optional so that partial payloads still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reads an explicit `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Return on investment reported for a coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub times: f64,
    pub currency: String,
    pub percentage: f64,
}

/// Market snapshot for a single coin
///
/// Numeric fields are `None` when the source omitted them or sent `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Coin {
    /// Stable identifier (e.g. "bitcoin")
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    /// Ticker symbol (e.g. "btc")
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    /// Display name (e.g. "Bitcoin")
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Image URL
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_change_percentage: Option<f64>,
    pub ath_date: Option<String>,
    pub atl: Option<f64>,
    pub atl_change_percentage: Option<f64>,
    pub atl_date: Option<String>,
    pub roi: Option<Roi>,
    pub last_updated: Option<String>,
}

impl Coin {
    /// Create a coin carrying only its identifying fields
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Value used when ordering by `sort_type`, if the coin has one
    pub fn metric(&self, sort_type: SortType) -> Option<f64> {
        match sort_type {
            SortType::MarketCap => self.market_cap,
            SortType::Volume => self.total_volume,
            SortType::Price => self.current_price,
            SortType::Name | SortType::Unsorted => None,
        }
    }

    /// True when the 24h change is known and non-negative
    pub fn is_positive(&self) -> bool {
        self.price_change_percentage_24h
            .map(|c| c >= 0.0)
            .unwrap_or(false)
    }
}

/// Image set for a coin detail page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinImage {
    pub thumb: Option<String>,
    pub small: Option<String>,
    pub large: Option<String>,
}

/// Localized description
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinDescription {
    pub en: String,
}

/// Source repositories
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposUrl {
    pub github: Vec<String>,
    pub bitbucket: Vec<String>,
}

/// Project links
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinLinks {
    pub homepage: Vec<String>,
    pub blockchain_site: Vec<String>,
    pub official_forum_url: Vec<String>,
    pub chat_url: Vec<String>,
    pub announcement_url: Vec<String>,
    pub twitter_screen_name: Option<String>,
    pub subreddit_url: Option<String>,
    pub repos_url: ReposUrl,
}

/// Per-currency market figures for a coin detail page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketData {
    pub current_price: HashMap<String, f64>,
    pub market_cap: HashMap<String, f64>,
    pub total_volume: HashMap<String, f64>,
    pub high_24h: HashMap<String, f64>,
    pub low_24h: HashMap<String, f64>,
    pub ath: HashMap<String, f64>,
    pub atl: HashMap<String, f64>,
    pub market_cap_rank: Option<u32>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_14d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub price_change_percentage_60d: Option<f64>,
    pub price_change_percentage_200d: Option<f64>,
    pub price_change_percentage_1y: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub last_updated: Option<String>,
}

/// Full detail record for one coin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image: CoinImage,
    pub market_cap_rank: Option<u32>,
    pub last_updated: Option<String>,
    pub description: Option<CoinDescription>,
    pub links: Option<CoinLinks>,
    pub market_data: Option<MarketData>,
}

impl CoinDetail {
    /// Current price quoted in `currency`, if the detail carries it
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.market_data
            .as_ref()?
            .current_price
            .get(&currency.to_lowercase())
            .copied()
    }
}

/// One `[unix_timestamp_ms, value]` sample of a chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint(pub f64, pub f64);

impl ChartPoint {
    pub fn timestamp_ms(&self) -> f64 {
        self.0
    }

    pub fn value(&self) -> f64 {
        self.1
    }
}

/// Historical series for one coin
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartData {
    pub prices: Vec<ChartPoint>,
    pub market_caps: Vec<ChartPoint>,
    pub total_volumes: Vec<ChartPoint>,
}

impl ChartData {
    /// Number of price samples
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Most recent price sample
    pub fn latest_price(&self) -> Option<f64> {
        self.prices.last().map(ChartPoint::value)
    }

    /// (min, max) over the finite price samples
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.prices
            .iter()
            .map(ChartPoint::value)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }
}

/// Key the coin list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    Name,
    Price,
    Volume,
    MarketCap,
    /// Keep the order the source returned; unknown keys land here
    #[serde(other)]
    Unsorted,
}

impl SortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Name => "name",
            SortType::Price => "price",
            SortType::Volume => "volume",
            SortType::MarketCap => "market_cap",
            SortType::Unsorted => "unsorted",
        }
    }

    /// Label for selection menus
    pub fn label(&self) -> &'static str {
        match self {
            SortType::Name => "Name",
            SortType::Price => "Price",
            SortType::Volume => "Volume",
            SortType::MarketCap => "Market Cap",
            SortType::Unsorted => "Default",
        }
    }

    /// Sort keys offered to the user
    pub fn all() -> &'static [SortType] {
        &[
            SortType::Name,
            SortType::Price,
            SortType::Volume,
            SortType::MarketCap,
        ]
    }
}

impl Default for SortType {
    fn default() -> Self {
        SortType::MarketCap
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "name" => SortType::Name,
            "price" => SortType::Price,
            "volume" => SortType::Volume,
            "market_cap" => SortType::MarketCap,
            _ => SortType::Unsorted,
        })
    }
}

/// Direction of the primary sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// The opposite direction
    pub fn toggled(&self) -> SortOrder {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side ordering parameter, e.g. `market_cap_desc`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SortOption {
    pub sort_type: SortType,
    pub sort_order: SortOrder,
}

impl SortOption {
    pub fn new(sort_type: SortType, sort_order: SortOrder) -> Self {
        Self {
            sort_type,
            sort_order,
        }
    }

    /// Value for the `order` query parameter of `/coins/markets`
    pub fn as_param(&self) -> String {
        match self.sort_type {
            // CoinGecko has no "unsorted"; id order is the closest neutral choice
            SortType::Unsorted => format!("id_{}", self.sort_order),
            other => format!("{}_{}", other, self.sort_order),
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}

/// Search and ordering settings the coin list is projected with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectionQuery {
    pub search_query: String,
    pub sort_type: SortType,
    pub sort_order: SortOrder,
}

impl ProjectionQuery {
    pub fn new(search_query: impl Into<String>, sort_type: SortType, sort_order: SortOrder) -> Self {
        Self {
            search_query: search_query.into(),
            sort_type,
            sort_order,
        }
    }

    /// The server-side ordering matching this query
    pub fn sort_option(&self) -> SortOption {
        SortOption::new(self.sort_type, self.sort_order)
    }
}

/// Chart periods offered on the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    Week,
    Month,
    Quarter,
    Year,
}

impl ChartRange {
    pub fn days(&self) -> u32 {
        match self {
            ChartRange::Week => 7,
            ChartRange::Month => 30,
            ChartRange::Quarter => 90,
            ChartRange::Year => 365,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartRange::Week => "7D",
            ChartRange::Month => "30D",
            ChartRange::Quarter => "90D",
            ChartRange::Year => "1Y",
        }
    }

    pub fn all() -> &'static [ChartRange] {
        &[
            ChartRange::Week,
            ChartRange::Month,
            ChartRange::Quarter,
            ChartRange::Year,
        ]
    }
}

impl Default for ChartRange {
    fn default() -> Self {
        ChartRange::Month
    }
}

/// The independently loaded resources of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    List,
    Detail,
    Chart,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::List => "list",
            ResourceKind::Detail => "detail",
            ResourceKind::Chart => "chart",
        }
    }

    /// Message shown to the user when a load of this resource fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            ResourceKind::List => "Failed to load cryptocurrency data",
            ResourceKind::Detail => "Failed to load coin details",
            ResourceKind::Chart => "Failed to load chart data",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications emitted by the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackerEvent {
    /// The coin list was replaced
    CoinsUpdated {
        id: Uuid,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Detail for the selected coin was replaced
    CoinDetailUpdated {
        id: Uuid,
        coin_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Chart for the selected coin was replaced
    ChartDataUpdated {
        id: Uuid,
        coin_id: String,
        days: u32,
        points: usize,
        timestamp: DateTime<Utc>,
    },

    /// A load failed; previous data, if any, is still shown
    LoadFailed {
        id: Uuid,
        resource: ResourceKind,
        coin_id: Option<String>,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A coin was added to or removed from the favorites
    FavoriteToggled {
        id: Uuid,
        coin_id: String,
        favorite: bool,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn coins_updated(count: usize) -> Self {
        Self::CoinsUpdated {
            id: Uuid::new_v4(),
            count,
            timestamp: Utc::now(),
        }
    }

    pub fn coin_detail_updated(coin_id: &str) -> Self {
        Self::CoinDetailUpdated {
            id: Uuid::new_v4(),
            coin_id: coin_id.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn chart_data_updated(coin_id: &str, days: u32, points: usize) -> Self {
        Self::ChartDataUpdated {
            id: Uuid::new_v4(),
            coin_id: coin_id.to_string(),
            days,
            points,
            timestamp: Utc::now(),
        }
    }

    pub fn load_failed(resource: ResourceKind, coin_id: Option<&str>, error_message: String) -> Self {
        Self::LoadFailed {
            id: Uuid::new_v4(),
            resource,
            coin_id: coin_id.map(str::to_string),
            error_message,
            timestamp: Utc::now(),
        }
    }

    pub fn favorite_toggled(coin_id: &str, favorite: bool) -> Self {
        Self::FavoriteToggled {
            id: Uuid::new_v4(),
            coin_id: coin_id.to_string(),
            favorite,
            timestamp: Utc::now(),
        }
    }

    /// Get the event ID
    pub fn id(&self) -> Uuid {
        match self {
            TrackerEvent::CoinsUpdated { id, .. } => *id,
            TrackerEvent::CoinDetailUpdated { id, .. } => *id,
            TrackerEvent::ChartDataUpdated { id, .. } => *id,
            TrackerEvent::LoadFailed { id, .. } => *id,
            TrackerEvent::FavoriteToggled { id, .. } => *id,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::CoinsUpdated { .. } => "COINS_UPDATED",
            TrackerEvent::CoinDetailUpdated { .. } => "COIN_DETAIL_UPDATED",
            TrackerEvent::ChartDataUpdated { .. } => "CHART_DATA_UPDATED",
            TrackerEvent::LoadFailed { .. } => "LOAD_FAILED",
            TrackerEvent::FavoriteToggled { .. } => "FAVORITE_TOGGLED",
        }
    }
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEvent::CoinsUpdated { count, .. } => write!(f, "Loaded {} coins", count),
            TrackerEvent::CoinDetailUpdated { coin_id, .. } => {
                write!(f, "Loaded details for {}", coin_id)
            }
            TrackerEvent::ChartDataUpdated {
                coin_id,
                days,
                points,
                ..
            } => write!(f, "Loaded {}d chart for {} ({} points)", days, coin_id, points),
            TrackerEvent::LoadFailed { resource, .. } => {
                f.write_str(resource.failure_message())
            }
            TrackerEvent::FavoriteToggled {
                coin_id, favorite, ..
            } => {
                if *favorite {
                    write!(f, "Added {} to favorites", coin_id)
                } else {
                    write!(f, "Removed {} from favorites", coin_id)
                }
            }
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Fresh data is available
    Healthy,
    /// Data is shown but stale or the last load failed
    Degraded,
    /// Nothing to show
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
