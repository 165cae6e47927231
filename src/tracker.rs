//! Coin tracker service
//!
//! Wires a market data source, the collection store, favorites, persisted
//! preferences and the background pollers into one object an application
//! constructs once and passes around.

use crate::{
    config::{SourceKind, TrackerConfig},
    debounce::SearchDebouncer,
    error::{FavoritesError, PersistError, SourceError, TrackerError},
    favorites::{FavoritesProvider, SessionFavorites},
    metrics::LoadMetrics,
    persist::{JsonFileStorage, PersistedState, PreferenceStorage},
    projection,
    resource::ResourceStatus,
    scheduler::RefreshScheduler,
    source::MarketDataSource,
    sources::{CoinGeckoSource, FailoverSource, MockMarketSource},
    store::CoinCollectionStore,
    types::{
        ChartRange, Coin, ComponentHealth, HealthStatus, ResourceKind, SortOrder, SortType,
        TrackerEvent,
    },
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Coin tracker
///
/// # Example
/// ```no_run
/// use coin_tracker_sdk::{CoinTracker, TrackerConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = CoinTracker::from_config(TrackerConfig::from_env()?)?;
/// tracker.start().await;
/// for coin in tracker.visible_coins().await {
///     println!("{}: {:?}", coin.name, coin.current_price);
/// }
/// tracker.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct CoinTracker {
    config: TrackerConfig,
    store: Arc<CoinCollectionStore>,
    favorites: Arc<dyn FavoritesProvider>,
    storage: Option<Arc<dyn PreferenceStorage>>,
    scheduler: RefreshScheduler,
    debouncer: SearchDebouncer,
    chart_range: Mutex<ChartRange>,
}

impl CoinTracker {
    /// Creates a tracker from its parts
    ///
    /// # Arguments
    /// * `config` - Intervals, currency and display settings
    /// * `source` - Market data source
    /// * `favorites` - Favorites backing store
    /// * `storage` - Where preferences are persisted, if anywhere
    pub fn new(
        config: TrackerConfig,
        source: Arc<dyn MarketDataSource>,
        favorites: Arc<dyn FavoritesProvider>,
        storage: Option<Arc<dyn PreferenceStorage>>,
    ) -> Self {
        let store = Arc::new(CoinCollectionStore::new(
            source,
            config.vs_currency.clone(),
            config.refresh_interval,
        ));
        let scheduler = RefreshScheduler::new(store.clone());
        let debouncer = SearchDebouncer::new(store.clone(), config.search_debounce_delay);

        Self {
            config,
            store,
            favorites,
            storage,
            scheduler,
            debouncer,
            chart_range: Mutex::new(ChartRange::default()),
        }
    }

    /// Creates a tracker with the source, favorites and storage `config` names
    pub fn from_config(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        let source = build_source(&config)?;
        let favorites: Arc<dyn FavoritesProvider> =
            Arc::new(SessionFavorites::new(config.favorites_policy));
        let storage = config
            .storage_path
            .clone()
            .map(|path| Arc::new(JsonFileStorage::new(path)) as Arc<dyn PreferenceStorage>);

        tracing::info!(
            source = source.source_name(),
            vs_currency = %config.vs_currency,
            refresh_interval_ms = config.refresh_interval.as_millis() as u64,
            "Creating coin tracker"
        );

        Ok(Self::new(config, source, favorites, storage))
    }

    /// Restores preferences, loads the coin list and starts polling it
    pub async fn start(&self) {
        self.restore_preferences().await;
        self.store.refresh_coins().await;
        self.scheduler.start_list();
    }

    /// Stops every poller and saves preferences
    pub async fn shutdown(&self) -> Result<(), PersistError> {
        self.scheduler.stop_all();
        self.debouncer.cancel();
        tracing::info!("Coin tracker stopped");
        self.save_preferences().await
    }

    async fn restore_preferences(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let state = storage.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load stored preferences, using defaults");
            PersistedState::default()
        });

        self.store.set_sort_type(state.sort_type).await;
        self.store.set_sort_order(state.sort_order).await;
        self.favorites.hydrate(state.favorites);
        tracing::debug!(
            sort_type = %state.sort_type,
            sort_order = %state.sort_order,
            "Restored preferences"
        );
    }

    async fn save_preferences(&self) -> Result<(), PersistError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let query = self.store.query().await;
        storage.save(&PersistedState {
            sort_type: query.sort_type,
            sort_order: query.sort_order,
            favorites: self.favorites.snapshot(),
            ..Default::default()
        })
    }

    async fn persist(&self) {
        if let Err(e) = self.save_preferences().await {
            tracing::warn!(error = %e, "Failed to save preferences");
        }
    }

    /// Applies `query` as the search filter right away
    pub async fn search(&self, query: impl Into<String>) {
        self.debouncer.cancel();
        self.store.set_search_query(query).await;
    }

    /// Debounced search input, for applying keystrokes as they arrive
    pub fn search_debouncer(&self) -> &SearchDebouncer {
        &self.debouncer
    }

    /// Changes the list ordering and remembers it
    pub async fn set_sort(&self, sort_type: SortType, sort_order: SortOrder) {
        self.store.set_sort_type(sort_type).await;
        self.store.set_sort_order(sort_order).await;
        self.persist().await;
    }

    /// Opens the detail view of `coin_id`
    ///
    /// Loads detail and chart for `range`, then keeps polling both.
    pub async fn select_coin(&self, coin_id: &str, range: ChartRange) {
        *self.chart_range.lock().unwrap_or_else(|e| e.into_inner()) = range;
        self.store.set_selected_coin(Some(coin_id.to_string())).await;

        futures::join!(
            self.store.load_coin_detail(coin_id),
            self.store.load_chart_data(coin_id, range.days())
        );
        self.scheduler.start_selected(coin_id, range.days());
    }

    /// Returns to the list view
    pub async fn deselect(&self) {
        self.scheduler.stop_selected();
        self.store.set_selected_coin(None).await;
    }

    /// Switches the chart period of the selected coin
    pub async fn set_chart_range(&self, range: ChartRange) {
        *self.chart_range.lock().unwrap_or_else(|e| e.into_inner()) = range;
        if let Some(coin_id) = self.store.selected_coin().await {
            self.store.load_chart_data(&coin_id, range.days()).await;
            self.scheduler.start_selected(&coin_id, range.days());
        }
    }

    pub fn chart_range(&self) -> ChartRange {
        *self.chart_range.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds or removes `coin_id` from the favorites
    ///
    /// # Returns
    /// The new membership, or `RequiresAuth` when favorites need a user
    pub async fn toggle_favorite(&self, coin_id: &str) -> Result<bool, FavoritesError> {
        let favorite = self.favorites.toggle_favorite(coin_id)?;
        self.store
            .emit(TrackerEvent::favorite_toggled(coin_id, favorite));
        self.persist().await;
        Ok(favorite)
    }

    pub fn is_favorite(&self, coin_id: &str) -> bool {
        self.favorites.is_favorite(coin_id)
    }

    pub fn favorites(&self) -> &Arc<dyn FavoritesProvider> {
        &self.favorites
    }

    /// Reloads the list and the selected coin now, outside the poll cycle
    pub async fn refresh_now(&self) {
        futures::join!(self.store.refresh_coins(), self.store.refresh_selected());
    }

    /// The coin list as it should be displayed
    pub async fn visible_coins(&self) -> Vec<Coin> {
        let coins = self.store.coins().await;
        let query = self.store.query().await;
        projection::project(&coins, &query, &self.favorites.favorite_set())
    }

    pub fn store(&self) -> &Arc<CoinCollectionStore> {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.store.subscribe()
    }

    pub fn source_name(&self) -> &'static str {
        self.store.source_name()
    }

    /// Placeholder rows a list view shows while nothing is loaded
    pub fn skeleton_item_count(&self) -> usize {
        self.config.skeleton_item_count
    }

    pub async fn metrics(&self, resource: ResourceKind) -> LoadMetrics {
        self.store.metrics(resource).await
    }

    /// Perform a health check on the coin tracker
    ///
    /// # Returns
    /// ComponentHealth derived from the state of the coin list
    pub async fn health_check(&self) -> ComponentHealth {
        let now = Utc::now();
        let list_status = self.store.list_status(now).await;
        let coin_count = self.store.coins().await.len();
        let metrics = self.store.metrics(ResourceKind::List).await;

        let last_updated = self.store.list_last_updated().await;
        let last_error = self.store.last_error(ResourceKind::List).await;
        let selected_coin = self.store.selected_coin().await;

        let mut details = HashMap::new();
        details.insert("coin_count".to_string(), serde_json::json!(coin_count));
        details.insert("source_name".to_string(), serde_json::json!(self.source_name()));
        details.insert("list_status".to_string(), serde_json::json!(list_status));
        details.insert("list_last_updated".to_string(), serde_json::json!(last_updated));
        details.insert("last_error".to_string(), serde_json::json!(last_error));
        details.insert("success_rate".to_string(), serde_json::json!(metrics.success_rate));
        details.insert("selected_coin".to_string(), serde_json::json!(selected_coin));

        let (status, message) = match (list_status, coin_count) {
            (ResourceStatus::Loaded | ResourceStatus::Loading, n) if n > 0 => (
                HealthStatus::Healthy,
                "Coin tracker is operational with fresh data".to_string(),
            ),
            (ResourceStatus::LoadedStale, _) => (
                HealthStatus::Degraded,
                "Coin list has not been refreshed within the refresh interval".to_string(),
            ),
            (ResourceStatus::Error, n) if n > 0 => (
                HealthStatus::Degraded,
                "Last coin list refresh failed, showing previous data".to_string(),
            ),
            _ => (
                HealthStatus::Unhealthy,
                "Coin tracker has no coin data".to_string(),
            ),
        };

        ComponentHealth {
            name: "coin_tracker".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: now,
        }
    }
}

/// Builds the market data source `config` selects
pub fn build_source(config: &TrackerConfig) -> Result<Arc<dyn MarketDataSource>, SourceError> {
    let mock = || {
        Arc::new(MockMarketSource::new(config.mock_seed).with_latency(config.mock_latency))
            as Arc<dyn MarketDataSource>
    };
    let coingecko = || -> Result<Arc<dyn MarketDataSource>, SourceError> {
        Ok(Arc::new(CoinGeckoSource::with_options(
            config.coingecko_base_url.clone(),
            config.coingecko_api_key.clone(),
            config.request_timeout,
        )?))
    };

    Ok(match config.source {
        SourceKind::Mock => mock(),
        SourceKind::CoinGecko => coingecko()?,
        // CoinGecko (primary) -> mock data (backup)
        SourceKind::Failover => Arc::new(FailoverSource::new(vec![coingecko()?, mock()])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::FavoritesPolicy;
    use crate::persist::MemoryStorage;
    use crate::source::mock::MockSource;
    use std::time::Duration;

    fn coin(id: &str, name: &str, market_cap: f64) -> Coin {
        let mut coin = Coin::new(id, id, name);
        coin.market_cap = Some(market_cap);
        coin
    }

    fn tracker_with(
        source: Arc<MockSource>,
        policy: FavoritesPolicy,
        storage: Option<Arc<dyn PreferenceStorage>>,
    ) -> CoinTracker {
        CoinTracker::new(
            TrackerConfig::default(),
            source,
            Arc::new(SessionFavorites::new(policy)),
            storage,
        )
    }

    #[tokio::test]
    async fn test_visible_coins_promote_favorites() {
        let source = Arc::new(MockSource::with_coins(vec![
            coin("a", "Bitcoin", 100.0),
            coin("b", "Ether", 200.0),
        ]));
        let tracker = tracker_with(source, FavoritesPolicy::AllowAnonymous, None);
        tracker.start().await;

        let ids = |coins: Vec<Coin>| coins.into_iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(tracker.visible_coins().await), vec!["b", "a"]);

        assert_eq!(tracker.toggle_favorite("a").await, Ok(true));
        assert_eq!(ids(tracker.visible_coins().await), vec!["a", "b"]);

        tracker.search("bit").await;
        assert_eq!(ids(tracker.visible_coins().await), vec!["a"]);
        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_requires_auth_when_configured() {
        let tracker = tracker_with(
            Arc::new(MockSource::new()),
            FavoritesPolicy::RequireAuth,
            None,
        );
        let mut events = tracker.subscribe();

        assert_eq!(tracker.toggle_favorite("a").await, Err(FavoritesError::RequiresAuth));
        assert!(!tracker.is_favorite("a"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_preferences_survive_restart() {
        let storage: Arc<dyn PreferenceStorage> = Arc::new(MemoryStorage::new());
        let source = Arc::new(MockSource::new());

        let first = tracker_with(source.clone(), FavoritesPolicy::AllowAnonymous, Some(storage.clone()));
        first.set_sort(SortType::Name, SortOrder::Asc).await;
        first.toggle_favorite("solana").await.unwrap();
        first.shutdown().await.unwrap();

        let second = tracker_with(source, FavoritesPolicy::AllowAnonymous, Some(storage));
        second.start().await;
        let query = second.store().query().await;
        assert_eq!(query.sort_type, SortType::Name);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert!(second.is_favorite("solana"));
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_select_and_deselect() {
        let source = Arc::new(MockSource::new());
        let tracker = tracker_with(source.clone(), FavoritesPolicy::AllowAnonymous, None);

        tracker.select_coin("bitcoin", ChartRange::Week).await;
        assert_eq!(tracker.store().coin_detail().await.unwrap().id, "bitcoin");
        assert_eq!(tracker.store().chart_data().await.unwrap().len(), 8);

        tracker.set_chart_range(ChartRange::Month).await;
        assert_eq!(tracker.chart_range(), ChartRange::Month);
        assert_eq!(tracker.store().chart_data().await.unwrap().len(), 31);

        tracker.deselect().await;
        assert!(tracker.store().selected_coin().await.is_none());
        assert!(tracker.store().coin_detail().await.is_none());
        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_follows_list_state() {
        let source = Arc::new(MockSource::with_coins(vec![coin("a", "Bitcoin", 1.0)]));
        let tracker = tracker_with(source.clone(), FavoritesPolicy::AllowAnonymous, None);

        assert_eq!(tracker.health_check().await.status, HealthStatus::Unhealthy);

        tracker.refresh_now().await;
        let health = tracker.health_check().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.details["coin_count"], serde_json::json!(1));

        source.set_error(SourceError::Timeout);
        tracker.refresh_now().await;
        assert_eq!(tracker.health_check().await.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_debounced_search_reaches_projection() {
        let source = Arc::new(MockSource::with_coins(vec![
            coin("a", "Bitcoin", 1.0),
            coin("b", "Ether", 2.0),
        ]));
        let tracker = CoinTracker::new(
            TrackerConfig::default().with_search_debounce(Duration::from_millis(20)),
            source,
            Arc::new(SessionFavorites::default()),
            None,
        );
        tracker.refresh_now().await;

        tracker.search_debouncer().push("e");
        tracker.search_debouncer().push("eth");
        tokio::time::sleep(Duration::from_millis(80)).await;

        let visible = tracker.visible_coins().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "b");
    }

    #[test]
    fn test_build_source_per_kind() {
        let config = TrackerConfig::default();
        assert_eq!(build_source(&config).unwrap().source_name(), "mock");

        let config = config.with_source(SourceKind::Failover);
        assert_eq!(build_source(&config).unwrap().source_name(), "failover");

        let config = config.with_source(SourceKind::CoinGecko);
        assert_eq!(build_source(&config).unwrap().source_name(), "coingecko");
    }
}
