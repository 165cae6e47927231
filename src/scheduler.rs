//! Background refresh of the store's resources
//!
//! One tokio task per resource wakes up every poll tick and starts a load
//! when the resource is due (never loaded, failed, or older than the refresh
//! interval). Loads run in their own task so that stopping a poller never
//! cancels a request halfway and leaves the resource stuck in `Loading`.

use crate::{constants::MIN_POLL_TICK_MS, store::CoinCollectionStore, types::ResourceKind};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Poll period for a given refresh interval
///
/// A quarter of the interval, but at least `MIN_POLL_TICK_MS` and at most
/// the interval itself. A zero interval polls every `MIN_POLL_TICK_MS`.
pub fn poll_tick(refresh_interval: Duration) -> Duration {
    let floor = Duration::from_millis(MIN_POLL_TICK_MS);
    if refresh_interval.is_zero() {
        return floor;
    }
    (refresh_interval / 4).max(floor).min(refresh_interval)
}

/// Owns the polling tasks of one store
pub struct RefreshScheduler {
    store: Arc<CoinCollectionStore>,
    tick: Duration,
    tasks: Mutex<HashMap<ResourceKind, JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(store: Arc<CoinCollectionStore>) -> Self {
        let tick = poll_tick(store.refresh_interval());
        Self {
            store,
            tick,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Starts polling the coin list, replacing any running list poller
    pub fn start_list(&self) {
        tracing::info!(
            refresh_interval_ms = self.store.refresh_interval().as_millis() as u64,
            poll_tick_ms = self.tick.as_millis() as u64,
            "Starting coin list polling"
        );
        self.spawn(ResourceKind::List, |store| async move {
            store.refresh_coins().await;
        });
    }

    /// Starts polling detail and chart of `coin_id`
    ///
    /// Polling of a previously selected coin is stopped first.
    pub fn start_selected(&self, coin_id: &str, days: u32) {
        tracing::debug!(coin_id, days, "Starting selected coin polling");

        let detail_id = coin_id.to_string();
        self.spawn(ResourceKind::Detail, move |store| {
            let coin_id = detail_id.clone();
            async move { store.load_coin_detail(&coin_id).await }
        });

        let chart_id = coin_id.to_string();
        self.spawn(ResourceKind::Chart, move |store| {
            let coin_id = chart_id.clone();
            async move { store.load_chart_data(&coin_id, days).await }
        });
    }

    /// Stops detail and chart polling
    pub fn stop_selected(&self) {
        let mut tasks = self.tasks();
        for kind in [ResourceKind::Detail, ResourceKind::Chart] {
            if let Some(handle) = tasks.remove(&kind) {
                handle.abort();
            }
        }
    }

    /// Stops every poller
    pub fn stop_all(&self) {
        let mut tasks = self.tasks();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }

    /// True if a poller for `resource` is running
    pub fn is_running(&self, resource: ResourceKind) -> bool {
        self.tasks()
            .get(&resource)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<ResourceKind, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn<F, Fut>(&self, resource: ResourceKind, load: F)
    where
        F: Fn(Arc<CoinCollectionStore>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let store = self.store.clone();
        let tick = self.tick;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !store.is_due(resource, Utc::now()).await {
                    continue;
                }
                let load = tokio::spawn(load(store.clone()));
                if let Err(e) = load.await {
                    tracing::warn!(resource = %resource, error = %e, "Polling load task failed");
                }
            }
        });

        if let Some(previous) = self.tasks().insert(resource, handle) {
            previous.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;
    use crate::types::Coin;

    fn store(refresh: Duration) -> (Arc<MockSource>, Arc<CoinCollectionStore>) {
        let source = Arc::new(MockSource::with_coins(vec![Coin::new("bitcoin", "btc", "Bitcoin")]));
        let store = Arc::new(CoinCollectionStore::new(source.clone(), "usd", refresh));
        (source, store)
    }

    #[test]
    fn test_poll_tick_bounds() {
        assert_eq!(poll_tick(Duration::from_secs(30)), Duration::from_millis(7_500));
        assert_eq!(poll_tick(Duration::from_millis(400)), Duration::from_millis(250));
        assert_eq!(poll_tick(Duration::from_millis(100)), Duration::from_millis(100));
        assert_eq!(poll_tick(Duration::ZERO), Duration::from_millis(MIN_POLL_TICK_MS));
    }

    #[tokio::test]
    async fn test_zero_interval_keeps_polling() {
        let (source, store) = store(Duration::ZERO);
        let scheduler = RefreshScheduler::new(store.clone());

        scheduler.start_list();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(scheduler.is_running(ResourceKind::List));
        assert_eq!(source.coin_calls(), 1);
        assert_eq!(store.coins().await.len(), 1);
        scheduler.stop_all();
    }

    #[tokio::test]
    async fn test_failed_resource_retried_once_per_interval() {
        let (source, store) = store(Duration::from_secs(1));
        source.set_error(crate::error::SourceError::RateLimitExceeded);
        let scheduler = RefreshScheduler::new(store.clone());
        assert_eq!(scheduler.tick(), Duration::from_millis(250));

        scheduler.start_list();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(source.coin_calls(), 1);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(source.coin_calls(), 2);
        scheduler.stop_all();
    }

    #[tokio::test]
    async fn test_list_polling_loads_and_repeats() {
        let (source, store) = store(Duration::from_millis(300));
        let scheduler = RefreshScheduler::new(store.clone());

        scheduler.start_list();
        assert!(scheduler.is_running(ResourceKind::List));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.coin_calls(), 1);
        assert_eq!(store.coins().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(source.coin_calls() >= 2);

        scheduler.stop_all();
        assert!(!scheduler.is_running(ResourceKind::List));
    }

    #[tokio::test]
    async fn test_selected_polling_follows_selection() {
        let (source, store) = store(Duration::from_secs(60));
        let scheduler = RefreshScheduler::new(store.clone());

        store.set_selected_coin(Some("bitcoin".to_string())).await;
        scheduler.start_selected("bitcoin", 7);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(source.detail_calls(), 1);
        assert_eq!(source.chart_calls(), 1);
        assert_eq!(store.chart_data().await.unwrap().len(), 8);

        scheduler.stop_selected();
        assert!(!scheduler.is_running(ResourceKind::Detail));
        assert!(!scheduler.is_running(ResourceKind::Chart));
    }

    #[tokio::test]
    async fn test_stopping_mid_load_does_not_wedge_resource() {
        let (source, store) = store(Duration::from_secs(60));
        source.close_gate();
        let scheduler = RefreshScheduler::new(store.clone());

        scheduler.start_list();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.is_loading_coins().await);

        drop(scheduler);
        source.open_gate();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!store.is_loading_coins().await);
        assert_eq!(store.coins().await.len(), 1);
    }
}
