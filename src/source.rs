//! Source abstraction for fetching coin market data from external APIs

use crate::{
    error::SourceError,
    types::{ChartData, Coin, CoinDetail, SortOption},
};
use async_trait::async_trait;

/// Trait for market data sources
///
/// Implementations fetch coin snapshots from a remote API (CoinGecko) or
/// generate them locally (the mock source).
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches the tracked coin list
    ///
    /// # Arguments
    /// * `vs_currency` - Quote currency (e.g. "usd")
    /// * `sort` - Server-side ordering; callers re-sort locally
    ///
    /// # Returns
    /// A full snapshot of the list or an error if the fetch fails
    async fn fetch_coins(&self, vs_currency: &str, sort: SortOption)
        -> Result<Vec<Coin>, SourceError>;

    /// Fetches the detail record for one coin
    ///
    /// # Arguments
    /// * `coin_id` - Identifier of the coin (e.g. "bitcoin")
    async fn fetch_coin_detail(&self, coin_id: &str) -> Result<CoinDetail, SourceError>;

    /// Fetches price, market cap and volume series for one coin
    ///
    /// # Arguments
    /// * `coin_id` - Identifier of the coin
    /// * `vs_currency` - Quote currency
    /// * `days` - Length of the series
    /// * `interval` - Granularity hint (e.g. "daily")
    async fn fetch_chart_data(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
        interval: &str,
    ) -> Result<ChartData, SourceError>;

    /// Returns the name of this source
    fn source_name(&self) -> &'static str;
}
