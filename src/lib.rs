//! # Coin Tracker SDK
//!
//! Keeps a list of popular cryptocurrencies up to date from a market data
//! source (CoinGecko or a deterministic mock), together with the detail
//! record and price chart of whichever coin is selected.
//!
//! The pieces:
//!
//! - [`CoinCollectionStore`] holds the coin list, detail and chart, each with
//!   its own load state. A load that is already running is never started
//!   twice, and responses for a coin that is no longer selected are dropped.
//! - [`RefreshScheduler`] polls the store in the background.
//! - [`projection::project`] turns the raw list into the displayed one:
//!   search filter, sort, favorites first.
//! - [`FavoritesProvider`] keeps favorites per user (or anonymous).
//! - [`CoinTracker`] wires it all together and persists preferences.
//!
//! ## Usage
//!
//! ```no_run
//! use coin_tracker_sdk::{ChartRange, CoinTracker, SortOrder, SortType, TrackerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = CoinTracker::from_config(TrackerConfig::from_env()?)?;
//! tracker.start().await;
//!
//! tracker.set_sort(SortType::Price, SortOrder::Desc).await;
//! tracker.search("bit").await;
//! for coin in tracker.visible_coins().await {
//!     println!("{} ({}): {:?}", coin.name, coin.symbol, coin.current_price);
//! }
//!
//! tracker.select_coin("bitcoin", ChartRange::Week).await;
//! if let Some(chart) = tracker.store().chart_data().await {
//!     println!("{} chart points", chart.len());
//! }
//!
//! tracker.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod error;
pub mod favorites;
pub mod metrics;
pub mod persist;
pub mod projection;
pub mod resource;
pub mod scheduler;
pub mod source;
pub mod sources;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use config::{SourceKind, TrackerConfig};
pub use debounce::SearchDebouncer;
pub use error::{ConfigError, FavoritesError, PersistError, SourceError, TrackerError};
pub use favorites::{FavoriteSet, FavoritesPolicy, FavoritesProvider, SessionFavorites};
pub use metrics::LoadMetrics;
pub use persist::{JsonFileStorage, MemoryStorage, PersistedState, PreferenceStorage};
pub use resource::{ResourceState, ResourceStatus};
pub use scheduler::RefreshScheduler;
pub use source::MarketDataSource;
pub use sources::{CoinGeckoSource, FailoverSource, MockMarketSource};
pub use store::{CoinCollectionStore, StoreSnapshot};
pub use tracker::CoinTracker;
pub use types::{
    ChartData, ChartPoint, ChartRange, Coin, CoinDetail, ComponentHealth, HealthStatus,
    ProjectionQuery, ResourceKind, SortOption, SortOrder, SortType, TrackerEvent,
};
