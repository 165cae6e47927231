//! Failover market data source implementation

use crate::{
    error::SourceError,
    source::MarketDataSource,
    types::{ChartData, Coin, CoinDetail, SortOption},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Market data source that tries several sources in order
/// until one succeeds.
pub struct FailoverSource {
    sources: Vec<Arc<dyn MarketDataSource>>,
}

impl FailoverSource {
    /// Creates a new failover source with a list of sources
    ///
    /// The sources are tried in the order they are provided.
    pub fn new(sources: Vec<Arc<dyn MarketDataSource>>) -> Self {
        Self { sources }
    }

    fn no_sources() -> SourceError {
        SourceError::invalid_response("No sources configured for failover")
    }
}

#[async_trait]
impl MarketDataSource for FailoverSource {
    async fn fetch_coins(
        &self,
        vs_currency: &str,
        sort: SortOption,
    ) -> Result<Vec<Coin>, SourceError> {
        let mut last_error = None;

        for source in &self.sources {
            match source.fetch_coins(vs_currency, sort).await {
                Ok(coins) => return Ok(coins),
                Err(e) => {
                    tracing::warn!(
                        source = source.source_name(),
                        error = %e,
                        "Source failed to fetch coin list"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(Self::no_sources))
    }

    async fn fetch_coin_detail(&self, coin_id: &str) -> Result<CoinDetail, SourceError> {
        let mut last_error = None;

        for source in &self.sources {
            match source.fetch_coin_detail(coin_id).await {
                Ok(detail) => return Ok(detail),
                // The coin is unknown upstream; a fallback would only invent one
                Err(e @ SourceError::NotFound(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = source.source_name(),
                        coin_id,
                        error = %e,
                        "Source failed to fetch coin detail"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(Self::no_sources))
    }

    async fn fetch_chart_data(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
        interval: &str,
    ) -> Result<ChartData, SourceError> {
        let mut last_error = None;

        for source in &self.sources {
            match source
                .fetch_chart_data(coin_id, vs_currency, days, interval)
                .await
            {
                Ok(chart) => return Ok(chart),
                Err(e @ SourceError::NotFound(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source = source.source_name(),
                        coin_id,
                        error = %e,
                        "Source failed to fetch chart data"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(Self::no_sources))
    }

    fn source_name(&self) -> &'static str {
        "failover"
    }
}
