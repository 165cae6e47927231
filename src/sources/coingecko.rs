//! CoinGecko market data source implementation

use crate::{
    cache::ResponseCache,
    constants::{
        CHART_CACHE_TTL_SECS, COINGECKO_API_KEY_HEADER, COINGECKO_API_URL, COINS_CACHE_TTL_SECS,
        DETAIL_CACHE_TTL_SECS, POPULAR_COINS, REQUEST_TIMEOUT_SECS, USER_AGENT,
    },
    error::SourceError,
    source::MarketDataSource,
    types::{ChartData, Coin, CoinDetail, SortOption},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

/// CoinGecko market data source
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cache: ResponseCache,
}

impl CoinGeckoSource {
    /// Creates a source against the public CoinGecko API
    pub fn new() -> Result<Self, SourceError> {
        Self::with_options(COINGECKO_API_URL, None, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Creates a source with a custom base URL, API key and timeout
    ///
    /// # Arguments
    /// * `base_url` - API root without a trailing slash
    /// * `api_key` - Sent as the demo API key header when present
    /// * `timeout` - Per-request timeout
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(SourceError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            cache: ResponseCache::new(),
        })
    }

    fn markets_url(&self, vs_currency: &str, sort: SortOption) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&ids={}&order={}&price_change_percentage=24h",
            self.base_url,
            vs_currency,
            POPULAR_COINS.join(","),
            sort.as_param()
        )
    }

    fn detail_url(&self, coin_id: &str) -> String {
        format!(
            "{}/coins/{}?localization=false&tickers=false&community_data=false&developer_data=false",
            self.base_url, coin_id
        )
    }

    fn chart_url(&self, coin_id: &str, vs_currency: &str, days: u32, interval: &str) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}&interval={}&precision=3",
            self.base_url, coin_id, vs_currency, days, interval
        )
    }

    /// GETs `url` and decodes the body, serving from the cache while fresh
    ///
    /// # Arguments
    /// * `url` - Full request URL, also the cache key
    /// * `not_found_id` - Coin id reported if the API answers 404
    /// * `ttl` - How long a successful body is cached
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        not_found_id: &str,
        ttl: Duration,
    ) -> Result<T, SourceError> {
        let body = match self.cache.get(url).await {
            Some(body) => body,
            None => {
                let body = self.request(url, not_found_id).await?;
                self.cache.insert(url, body.clone(), ttl).await;
                body
            }
        };

        serde_json::from_str(&body).map_err(|e| {
            SourceError::invalid_response(format!("Failed to parse CoinGecko response: {}", e))
        })
    }

    async fn request(&self, url: &str, not_found_id: &str) -> Result<String, SourceError> {
        tracing::debug!(url, "Fetching from CoinGecko");

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(COINGECKO_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout
            } else {
                SourceError::NetworkError(e)
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::not_found(not_found_id)),
            StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimitExceeded),
            status if !status.is_success() => {
                return Err(SourceError::ApiError(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }
            _ => {}
        }

        response.text().await.map_err(SourceError::NetworkError)
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    #[instrument(skip(self), fields(source = "coingecko"))]
    async fn fetch_coins(
        &self,
        vs_currency: &str,
        sort: SortOption,
    ) -> Result<Vec<Coin>, SourceError> {
        let url = self.markets_url(vs_currency, sort);
        let coins: Vec<Coin> = self
            .get_json(&url, "markets", Duration::from_secs(COINS_CACHE_TTL_SECS))
            .await?;

        tracing::debug!(count = coins.len(), "Fetched coin list from CoinGecko");
        Ok(coins)
    }

    #[instrument(skip(self), fields(source = "coingecko"))]
    async fn fetch_coin_detail(&self, coin_id: &str) -> Result<CoinDetail, SourceError> {
        let url = self.detail_url(coin_id);
        self.get_json(&url, coin_id, Duration::from_secs(DETAIL_CACHE_TTL_SECS))
            .await
    }

    #[instrument(skip(self), fields(source = "coingecko"))]
    async fn fetch_chart_data(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
        interval: &str,
    ) -> Result<ChartData, SourceError> {
        let url = self.chart_url(coin_id, vs_currency, days, interval);
        let chart: ChartData = self
            .get_json(&url, coin_id, Duration::from_secs(CHART_CACHE_TTL_SECS))
            .await?;

        tracing::debug!(points = chart.len(), "Fetched chart from CoinGecko");
        Ok(chart)
    }

    fn source_name(&self) -> &'static str {
        "coingecko"
    }
}
