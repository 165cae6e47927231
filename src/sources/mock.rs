//! Deterministic mock market data source
//!
//! Generates plausible coin snapshots, detail pages and charts from a seeded
//! RNG, so the tracker can run without network access. Two sources built
//! with the same seed answer the same sequence of calls identically.

use crate::{
    constants::{DEFAULT_MOCK_SEED, POPULAR_COINS},
    error::SourceError,
    projection,
    source::MarketDataSource,
    types::{
        ChartData, ChartPoint, Coin, CoinDescription, CoinDetail, CoinImage, CoinLinks,
        MarketData, ReposUrl, Roi, SortOption, SortType,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const DAY_MS: f64 = 86_400_000.0;

/// Display name and ticker for the coins the mock knows by heart
fn known_coin(id: &str) -> Option<(&'static str, &'static str)> {
    let entry = match id {
        "bitcoin" => ("Bitcoin", "btc"),
        "ethereum" => ("Ethereum", "eth"),
        "tether" => ("Tether", "usdt"),
        "usd-coin" => ("USD Coin", "usdc"),
        "binancecoin" => ("BNB", "bnb"),
        "ripple" => ("XRP", "xrp"),
        "solana" => ("Solana", "sol"),
        "cardano" => ("Cardano", "ada"),
        "dogecoin" => ("Dogecoin", "doge"),
        "shiba-inu" => ("Shiba Inu", "shib"),
        "polkadot" => ("Polkadot", "dot"),
        "tron" => ("TRON", "trx"),
        "avalanche-2" => ("Avalanche", "avax"),
        "chainlink" => ("Chainlink", "link"),
        "matic-network" => ("Polygon", "matic"),
        "litecoin" => ("Litecoin", "ltc"),
        "polygon" => ("Polygon", "matic"),
        "wrapped-bitcoin" => ("Wrapped Bitcoin", "wbtc"),
        "uniswap" => ("Uniswap", "uni"),
        "ethereum-classic" => ("Ethereum Classic", "etc"),
        _ => return None,
    };
    Some(entry)
}

/// Anchor price in USD; other coins get a random anchor
fn base_price(id: &str) -> Option<f64> {
    match id {
        "bitcoin" => Some(45_000.0),
        "ethereum" => Some(2_500.0),
        "tether" | "usd-coin" => Some(1.0),
        "binancecoin" => Some(300.0),
        "ripple" => Some(0.5),
        "solana" => Some(100.0),
        "cardano" => Some(0.4),
        "dogecoin" => Some(0.08),
        "shiba-inu" => Some(0.000_015),
        _ => None,
    }
}

/// Mock market data source backed by a seeded RNG
pub struct MockMarketSource {
    rng: Mutex<StdRng>,
    latency: Duration,
    strict: bool,
}

impl MockMarketSource {
    /// Creates a mock source with no simulated latency
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
            strict: false,
        }
    }

    /// Delays every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// When set, detail and chart requests for coins outside the popular
    /// list fail with `NotFound`
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut rng)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_known(&self, coin_id: &str) -> Result<(), SourceError> {
        if self.strict && !POPULAR_COINS.contains(&coin_id) {
            return Err(SourceError::not_found(coin_id));
        }
        Ok(())
    }
}

impl Default for MockMarketSource {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_SEED)
    }
}

fn random_date(rng: &mut StdRng, now: DateTime<Utc>, max_days_ago: i64) -> String {
    let days_ago = rng.gen_range(0..max_days_ago.max(1));
    (now - chrono::Duration::days(days_ago)).to_rfc3339()
}

fn generate_coin(rng: &mut StdRng, id: &str, rank: u32, now: DateTime<Utc>) -> Coin {
    let (name, symbol) = known_coin(id)
        .map(|(n, s)| (n.to_string(), s.to_string()))
        .unwrap_or_else(|| (id.to_string(), id.to_lowercase()));

    let base = base_price(id).unwrap_or_else(|| rng.gen_range(0.01..1_000.0));
    let price = base * (1.0 + rng.gen_range(-0.15..0.15));
    let market_cap = price * rng.gen_range(10_000_000.0..1_000_000_000.0);
    let circulating_supply = market_cap / price;
    let change_24h = rng.gen_range(-0.2..0.2) * price;

    let roi = rng.gen_bool(0.5).then(|| Roi {
        times: rng.gen_range(0.1..100.0),
        currency: "usd".to_string(),
        percentage: rng.gen_range(-50.0..5_000.0),
    });

    Coin {
        id: id.to_string(),
        symbol,
        name,
        image: Some(format!("https://assets.coingecko.com/coins/images/{}/large.png", id)),
        current_price: Some(price),
        market_cap: Some(market_cap),
        market_cap_rank: Some(rank),
        fully_diluted_valuation: Some(market_cap * rng.gen_range(1.0..1.5)),
        total_volume: Some(market_cap * rng.gen_range(0.01..0.3)),
        high_24h: Some(price * rng.gen_range(1.01..1.15)),
        low_24h: Some(price * rng.gen_range(0.85..0.99)),
        price_change_24h: Some(change_24h),
        price_change_percentage_24h: Some(change_24h / price * 100.0),
        market_cap_change_24h: Some(rng.gen_range(-0.1..0.1) * market_cap),
        market_cap_change_percentage_24h: Some(rng.gen_range(-10.0..10.0)),
        circulating_supply: Some(circulating_supply),
        total_supply: Some(circulating_supply * rng.gen_range(1.0..2.0)),
        max_supply: Some(circulating_supply * rng.gen_range(1.0..5.0)),
        ath: Some(price * rng.gen_range(1.1..10.0)),
        ath_change_percentage: Some(rng.gen_range(-90.0..-10.0)),
        ath_date: Some(random_date(rng, now, 2_000)),
        atl: Some(price * rng.gen_range(0.01..0.9)),
        atl_change_percentage: Some(rng.gen_range(50.0..10_000.0)),
        atl_date: Some(random_date(rng, now, 3_000)),
        roi,
        last_updated: Some(now.to_rfc3339()),
    }
}

fn usd(value: Option<f64>) -> HashMap<String, f64> {
    value
        .map(|v| HashMap::from([("usd".to_string(), v)]))
        .unwrap_or_default()
}

fn generate_detail(rng: &mut StdRng, id: &str, now: DateTime<Utc>) -> CoinDetail {
    let rank = POPULAR_COINS
        .iter()
        .position(|c| *c == id)
        .map(|i| i as u32 + 1)
        .unwrap_or_else(|| rng.gen_range(21..100));
    let coin = generate_coin(rng, id, rank, now);

    let blurbs = [
        "is a decentralized cryptocurrency that operates on a peer-to-peer network.",
        "is a blockchain platform for smart contracts and decentralized applications.",
        "is a digital asset designed to provide stability and utility to its users.",
        "is a blockchain protocol focused on scalability and security.",
    ];
    let blurb = blurbs[rng.gen_range(0..blurbs.len())];

    CoinDetail {
        id: coin.id.clone(),
        symbol: coin.symbol.clone(),
        name: coin.name.clone(),
        image: CoinImage {
            thumb: coin.image.clone(),
            small: coin.image.clone(),
            large: coin.image.clone(),
        },
        market_cap_rank: coin.market_cap_rank,
        last_updated: coin.last_updated.clone(),
        description: Some(CoinDescription {
            en: format!("{} {}", coin.name, blurb),
        }),
        links: Some(CoinLinks {
            homepage: vec![format!("https://{}.org", id)],
            blockchain_site: vec![format!("https://explorer.{}.org", id)],
            official_forum_url: vec![format!("https://forum.{}.org", id)],
            chat_url: vec![format!("https://t.me/{}", id)],
            announcement_url: Vec::new(),
            twitter_screen_name: Some(id.to_string()),
            subreddit_url: Some(format!("https://www.reddit.com/r/{}", id)),
            repos_url: ReposUrl {
                github: vec![format!("https://github.com/{0}/{0}", id)],
                bitbucket: Vec::new(),
            },
        }),
        market_data: Some(MarketData {
            current_price: usd(coin.current_price),
            market_cap: usd(coin.market_cap),
            total_volume: usd(coin.total_volume),
            high_24h: usd(coin.high_24h),
            low_24h: usd(coin.low_24h),
            ath: usd(coin.ath),
            atl: usd(coin.atl),
            market_cap_rank: coin.market_cap_rank,
            price_change_24h: coin.price_change_24h,
            price_change_percentage_24h: coin.price_change_percentage_24h,
            price_change_percentage_7d: Some(rng.gen_range(-30.0..30.0)),
            price_change_percentage_14d: Some(rng.gen_range(-40.0..40.0)),
            price_change_percentage_30d: Some(rng.gen_range(-50.0..50.0)),
            price_change_percentage_60d: Some(rng.gen_range(-60.0..60.0)),
            price_change_percentage_200d: Some(rng.gen_range(-80.0..200.0)),
            price_change_percentage_1y: Some(rng.gen_range(-90.0..500.0)),
            circulating_supply: coin.circulating_supply,
            total_supply: coin.total_supply,
            max_supply: coin.max_supply,
            last_updated: coin.last_updated,
        }),
    }
}

/// Random walk with a slow sine trend, at most one point per day up to a year
fn generate_chart(rng: &mut StdRng, id: &str, days: u32, now: DateTime<Utc>) -> ChartData {
    let end = now.timestamp_millis() as f64;
    let start = end - days as f64 * DAY_MS;
    let steps = days.min(365);
    let step = if steps == 0 { 0.0 } else { (end - start) / steps as f64 };

    let mut price = base_price(id).unwrap_or_else(|| rng.gen_range(0.01..1_000.0));
    let mut market_cap = price * rng.gen_range(10_000_000.0..1_000_000_000.0);
    let mut volume = market_cap * rng.gen_range(0.01..0.3);

    let mut chart = ChartData::default();
    for i in 0..=steps {
        let timestamp = start + i as f64 * step;
        let progress = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
        let trend = (progress * std::f64::consts::TAU).sin() * 0.02;
        let change = trend + rng.gen_range(-0.04..0.04);

        price = (price * (1.0 + change)).max(0.000_001);
        market_cap = (market_cap * (1.0 + change * 0.8)).max(1_000.0);
        volume = (volume * (1.0 + rng.gen_range(-0.25..0.25))).max(1_000.0);

        chart.prices.push(ChartPoint(timestamp, price));
        chart.market_caps.push(ChartPoint(timestamp, market_cap));
        chart.total_volumes.push(ChartPoint(timestamp, volume));
    }
    chart
}

#[async_trait]
impl MarketDataSource for MockMarketSource {
    async fn fetch_coins(
        &self,
        _vs_currency: &str,
        sort: SortOption,
    ) -> Result<Vec<Coin>, SourceError> {
        self.simulate_latency().await;
        let now = Utc::now();

        let mut coins = self.with_rng(|rng| {
            POPULAR_COINS
                .iter()
                .enumerate()
                .map(|(i, id)| generate_coin(rng, id, i as u32 + 1, now))
                .collect::<Vec<_>>()
        });

        if sort.sort_type != SortType::Unsorted {
            coins.sort_by(|a, b| projection::compare(a, b, sort.sort_type, sort.sort_order));
        }

        tracing::debug!(count = coins.len(), order = %sort, "Generated mock coin list");
        Ok(coins)
    }

    async fn fetch_coin_detail(&self, coin_id: &str) -> Result<CoinDetail, SourceError> {
        self.check_known(coin_id)?;
        self.simulate_latency().await;
        Ok(self.with_rng(|rng| generate_detail(rng, coin_id, Utc::now())))
    }

    async fn fetch_chart_data(
        &self,
        coin_id: &str,
        _vs_currency: &str,
        days: u32,
        _interval: &str,
    ) -> Result<ChartData, SourceError> {
        self.check_known(coin_id)?;
        self.simulate_latency().await;
        Ok(self.with_rng(|rng| generate_chart(rng, coin_id, days, Utc::now())))
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortOrder;

    #[tokio::test]
    async fn test_list_covers_popular_coins() {
        let source = MockMarketSource::default();
        let coins = source
            .fetch_coins("usd", SortOption::default())
            .await
            .unwrap();

        assert_eq!(coins.len(), POPULAR_COINS.len());
        let btc = coins.iter().find(|c| c.id == "bitcoin").unwrap();
        assert_eq!(btc.name, "Bitcoin");
        assert_eq!(btc.symbol, "btc");
        let price = btc.current_price.unwrap();
        assert!((45_000.0 * 0.85..=45_000.0 * 1.15).contains(&price));
    }

    #[tokio::test]
    async fn test_same_seed_same_data() {
        let a = MockMarketSource::new(7);
        let b = MockMarketSource::new(7);
        let sort = SortOption::new(SortType::Name, SortOrder::Asc);

        let left = a.fetch_coins("usd", sort).await.unwrap();
        let right = b.fetch_coins("usd", sort).await.unwrap();
        let prices = |coins: &[Coin]| coins.iter().map(|c| c.current_price).collect::<Vec<_>>();

        assert_eq!(prices(&left), prices(&right));
    }

    #[tokio::test]
    async fn test_server_side_sort_applied() {
        let source = MockMarketSource::new(3);
        let sort = SortOption::new(SortType::Price, SortOrder::Desc);
        let coins = source.fetch_coins("usd", sort).await.unwrap();

        for pair in coins.windows(2) {
            assert!(pair[0].current_price >= pair[1].current_price);
        }
    }

    #[tokio::test]
    async fn test_chart_point_count() {
        let source = MockMarketSource::default();
        for (days, expected) in [(7, 8), (30, 31), (365, 366), (1000, 366), (0, 1)] {
            let chart = source
                .fetch_chart_data("bitcoin", "usd", days, "daily")
                .await
                .unwrap();
            assert_eq!(chart.prices.len(), expected, "days = {}", days);
            assert_eq!(chart.market_caps.len(), expected);
            assert!(chart.prices.iter().all(|p| p.value() > 0.0));
        }
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_coin() {
        let source = MockMarketSource::default().strict(true);
        let err = source.fetch_coin_detail("not-a-coin").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == "not-a-coin"));

        let lenient = MockMarketSource::default();
        let detail = lenient.fetch_coin_detail("not-a-coin").await.unwrap();
        assert_eq!(detail.id, "not-a-coin");
    }

    #[tokio::test]
    async fn test_detail_carries_usd_price() {
        let source = MockMarketSource::default();
        let detail = source.fetch_coin_detail("solana").await.unwrap();

        assert_eq!(detail.name, "Solana");
        assert_eq!(detail.market_cap_rank, Some(7));
        assert!(detail.price_in("usd").is_some());
    }
}
