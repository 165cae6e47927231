//! Market data source implementations

pub mod coingecko;
pub mod failover;
pub mod mock;

pub use coingecko::CoinGeckoSource;
pub use failover::FailoverSource;
pub use mock::MockMarketSource;
