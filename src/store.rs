//! In-memory coin collection store with broadcast capabilities
//!
//! Holds the three remotely loaded resources (coin list, detail of the
//! selected coin, chart of the selected coin) next to the local view
//! settings. Loads never fail outward: a failed fetch moves the resource to
//! `Error`, keeps whatever was shown before and emits a `LoadFailed` event.

use crate::{
    constants::{DEFAULT_CHART_DAYS, DEFAULT_CHART_INTERVAL, EVENT_CHANNEL_CAPACITY},
    error::SourceError,
    metrics::{LoadMetrics, MetricsCollector},
    resource::{LoadTicket, Resource, ResourceStatus},
    source::MarketDataSource,
    types::{
        ChartData, Coin, CoinDetail, ProjectionQuery, ResourceKind, SortOption, SortOrder,
        SortType, TrackerEvent,
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Default)]
struct StoreState {
    coins: Resource<Vec<Coin>>,
    detail: Resource<CoinDetail>,
    chart: Resource<ChartData>,
    query: ProjectionQuery,
    selected_coin: Option<String>,
    chart_days: u32,
}

impl StoreState {
    fn is_selected(&self, coin_id: &str) -> bool {
        self.selected_coin.as_deref() == Some(coin_id)
    }
}

/// Point-in-time copy of everything the store holds
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub coins: Vec<Coin>,
    pub coin_detail: Option<CoinDetail>,
    pub chart_data: Option<ChartData>,
    pub query: ProjectionQuery,
    pub selected_coin: Option<String>,
    pub chart_days: u32,
    pub list_status: ResourceStatus,
    pub detail_status: ResourceStatus,
    pub chart_status: ResourceStatus,
    pub list_last_updated: Option<DateTime<Utc>>,
    pub detail_last_updated: Option<DateTime<Utc>>,
}

/// Store for the coin list and the selected coin
///
/// Every resource allows one request in flight. A load requested while one
/// is running is dropped, not queued.
pub struct CoinCollectionStore {
    source: Arc<dyn MarketDataSource>,
    state: RwLock<StoreState>,
    vs_currency: String,
    refresh_interval: Duration,
    events: broadcast::Sender<TrackerEvent>,
    list_metrics: MetricsCollector,
    detail_metrics: MetricsCollector,
    chart_metrics: MetricsCollector,
}

impl CoinCollectionStore {
    /// Creates a new store
    ///
    /// # Arguments
    /// * `source` - Where coin data is fetched from
    /// * `vs_currency` - Quote currency for every request
    /// * `refresh_interval` - Age after which loaded data counts as stale
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        vs_currency: impl Into<String>,
        refresh_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            state: RwLock::new(StoreState {
                chart_days: DEFAULT_CHART_DAYS,
                ..Default::default()
            }),
            vs_currency: vs_currency.into(),
            refresh_interval,
            events,
            list_metrics: MetricsCollector::new(ResourceKind::List),
            detail_metrics: MetricsCollector::new(ResourceKind::Detail),
            chart_metrics: MetricsCollector::new(ResourceKind::Chart),
        }
    }

    /// Subscribes to store events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Returns the name of the underlying source
    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub(crate) fn emit(&self, event: TrackerEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn collector(&self, resource: ResourceKind) -> &MetricsCollector {
        match resource {
            ResourceKind::List => &self.list_metrics,
            ResourceKind::Detail => &self.detail_metrics,
            ResourceKind::Chart => &self.chart_metrics,
        }
    }

    /// Loads the coin list
    ///
    /// The source is asked to order by `sort_type`/`sort_order`; the list is
    /// re-sorted locally by the projection either way. Does nothing if a list
    /// load is already running.
    pub async fn load_coins(&self, sort_type: SortType, sort_order: SortOrder) {
        let Some(ticket) = self.state.write().await.coins.begin_load() else {
            tracing::debug!("Coin list load already in flight, skipping");
            return;
        };

        let sort = SortOption::new(sort_type, sort_order);
        let start = Instant::now();
        let result = self.source.fetch_coins(&self.vs_currency, sort).await;
        self.list_metrics
            .record_request(start.elapsed(), result.is_ok())
            .await;

        self.finish_list(ticket, result, start).await;
    }

    async fn finish_list(
        &self,
        ticket: LoadTicket,
        result: Result<Vec<Coin>, SourceError>,
        start: Instant,
    ) {
        let mut state = self.state.write().await;
        match result {
            Ok(coins) => {
                let count = coins.len();
                if state.coins.complete(ticket, coins, Utc::now()) {
                    drop(state);
                    tracing::debug!(
                        count,
                        source = self.source.source_name(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Coin list updated"
                    );
                    self.emit(TrackerEvent::coins_updated(count));
                }
            }
            Err(e) => {
                if state.coins.fail(ticket, e.to_string(), Utc::now()) {
                    drop(state);
                    self.report_failure(ResourceKind::List, None, &e);
                }
            }
        }
    }

    /// Loads the coin list with the current sort settings
    pub async fn refresh_coins(&self) {
        let sort = self.state.read().await.query.sort_option();
        self.load_coins(sort.sort_type, sort.sort_order).await;
    }

    /// Loads the detail record of `coin_id`
    ///
    /// Only the selected coin is loaded, and a response is dropped if the
    /// selection changed while it was in flight.
    pub async fn load_coin_detail(&self, coin_id: &str) {
        let ticket = {
            let mut state = self.state.write().await;
            if !state.is_selected(coin_id) {
                tracing::debug!(coin_id, "Coin is not selected, skipping detail load");
                return;
            }
            match state.detail.begin_load() {
                Some(ticket) => ticket,
                None => {
                    tracing::debug!(coin_id, "Detail load already in flight, skipping");
                    return;
                }
            }
        };

        let start = Instant::now();
        let result = self.source.fetch_coin_detail(coin_id).await;
        self.detail_metrics
            .record_request(start.elapsed(), result.is_ok())
            .await;

        let mut state = self.state.write().await;
        if !state.is_selected(coin_id) {
            tracing::debug!(coin_id, "Selection changed, dropping detail response");
            return;
        }
        match result {
            Ok(detail) => {
                if state.detail.complete(ticket, detail, Utc::now()) {
                    drop(state);
                    self.emit(TrackerEvent::coin_detail_updated(coin_id));
                }
            }
            Err(e) => {
                if state.detail.fail(ticket, e.to_string(), Utc::now()) {
                    drop(state);
                    self.report_failure(ResourceKind::Detail, Some(coin_id), &e);
                }
            }
        }
    }

    /// Loads `days` of chart history for `coin_id`
    ///
    /// Asking for a different period than the one shown drops the current
    /// chart first. While a chart load is in flight nothing is fetched; a
    /// new period is only recorded, the in-flight response for the old
    /// period is discarded and the next poll loads the new one.
    pub async fn load_chart_data(&self, coin_id: &str, days: u32) {
        let ticket = {
            let mut state = self.state.write().await;
            if !state.is_selected(coin_id) {
                tracing::debug!(coin_id, "Coin is not selected, skipping chart load");
                return;
            }
            if state.chart.is_loading() {
                if state.chart_days != days {
                    tracing::debug!(
                        coin_id,
                        from = state.chart_days,
                        to = days,
                        "Chart load in flight, period change deferred"
                    );
                    state.chart_days = days;
                } else {
                    tracing::debug!(coin_id, days, "Chart load already in flight, skipping");
                }
                return;
            }
            if state.chart_days != days {
                state.chart.reset();
                state.chart_days = days;
            }
            match state.chart.begin_load() {
                Some(ticket) => ticket,
                None => {
                    tracing::debug!(coin_id, days, "Chart load already in flight, skipping");
                    return;
                }
            }
        };

        let start = Instant::now();
        let result = self
            .source
            .fetch_chart_data(coin_id, &self.vs_currency, days, DEFAULT_CHART_INTERVAL)
            .await;
        self.chart_metrics
            .record_request(start.elapsed(), result.is_ok())
            .await;

        let mut state = self.state.write().await;
        if !state.is_selected(coin_id) {
            tracing::debug!(coin_id, days, "Selection changed, dropping chart response");
            return;
        }
        if state.chart_days != days {
            // Period changed mid-flight: back to Idle so the poller loads the new one
            tracing::debug!(coin_id, days, "Period changed, dropping chart response");
            state.chart.reset();
            return;
        }
        match result {
            Ok(chart) => {
                let points = chart.len();
                if state.chart.complete(ticket, chart, Utc::now()) {
                    drop(state);
                    self.emit(TrackerEvent::chart_data_updated(coin_id, days, points));
                }
            }
            Err(e) => {
                if state.chart.fail(ticket, e.to_string(), Utc::now()) {
                    drop(state);
                    self.report_failure(ResourceKind::Chart, Some(coin_id), &e);
                }
            }
        }
    }

    /// Reloads detail and chart of the selected coin, if any
    pub async fn refresh_selected(&self) {
        let (selected, days) = {
            let state = self.state.read().await;
            (state.selected_coin.clone(), state.chart_days)
        };
        if let Some(coin_id) = selected {
            futures::join!(
                self.load_coin_detail(&coin_id),
                self.load_chart_data(&coin_id, days)
            );
        }
    }

    fn report_failure(&self, resource: ResourceKind, coin_id: Option<&str>, error: &SourceError) {
        tracing::warn!(
            resource = %resource,
            coin_id = coin_id.unwrap_or("-"),
            source = self.source.source_name(),
            error = %error,
            "{}",
            resource.failure_message()
        );
        self.emit(TrackerEvent::load_failed(
            resource,
            coin_id,
            error.to_string(),
        ));
    }

    pub async fn set_sort_type(&self, sort_type: SortType) {
        self.state.write().await.query.sort_type = sort_type;
    }

    pub async fn set_sort_order(&self, sort_order: SortOrder) {
        self.state.write().await.query.sort_order = sort_order;
    }

    pub async fn set_search_query(&self, search_query: impl Into<String>) {
        self.state.write().await.query.search_query = search_query.into();
    }

    /// Changes the selected coin
    ///
    /// Selecting a different coin, or `None`, clears detail and chart so the
    /// previous coin's data is never shown for the new one.
    pub async fn set_selected_coin(&self, coin_id: Option<String>) {
        let mut state = self.state.write().await;
        if state.selected_coin == coin_id {
            return;
        }
        state.detail.reset();
        state.chart.reset();
        tracing::debug!(
            from = state.selected_coin.as_deref().unwrap_or("-"),
            to = coin_id.as_deref().unwrap_or("-"),
            "Selected coin changed"
        );
        state.selected_coin = coin_id;
    }

    pub async fn coins(&self) -> Vec<Coin> {
        self.state.read().await.coins.data().cloned().unwrap_or_default()
    }

    pub async fn coin_detail(&self) -> Option<CoinDetail> {
        self.state.read().await.detail.data().cloned()
    }

    pub async fn chart_data(&self) -> Option<ChartData> {
        self.state.read().await.chart.data().cloned()
    }

    pub async fn query(&self) -> ProjectionQuery {
        self.state.read().await.query.clone()
    }

    pub async fn selected_coin(&self) -> Option<String> {
        self.state.read().await.selected_coin.clone()
    }

    /// Chart period (in days) of the last chart request
    pub async fn chart_days(&self) -> u32 {
        self.state.read().await.chart_days
    }

    pub async fn is_loading_coins(&self) -> bool {
        self.state.read().await.coins.is_loading()
    }

    pub async fn is_loading_detail(&self) -> bool {
        self.state.read().await.detail.is_loading()
    }

    pub async fn is_loading_chart(&self) -> bool {
        self.state.read().await.chart.is_loading()
    }

    pub async fn list_status(&self, now: DateTime<Utc>) -> ResourceStatus {
        self.status(ResourceKind::List, now).await
    }

    pub async fn detail_status(&self, now: DateTime<Utc>) -> ResourceStatus {
        self.status(ResourceKind::Detail, now).await
    }

    pub async fn chart_status(&self, now: DateTime<Utc>) -> ResourceStatus {
        self.status(ResourceKind::Chart, now).await
    }

    /// Observed status of `resource` at `now`
    pub async fn status(&self, resource: ResourceKind, now: DateTime<Utc>) -> ResourceStatus {
        let state = self.state.read().await;
        let interval = self.refresh_interval;
        match resource {
            ResourceKind::List => state.coins.status(now, interval),
            ResourceKind::Detail => state.detail.status(now, interval),
            ResourceKind::Chart => state.chart.status(now, interval),
        }
    }

    /// True if a poll of `resource` should start a load at `now`
    ///
    /// Detail and chart are never due without a selected coin.
    pub async fn is_due(&self, resource: ResourceKind, now: DateTime<Utc>) -> bool {
        let state = self.state.read().await;
        let interval = self.refresh_interval;
        match resource {
            ResourceKind::List => state.coins.is_due(now, interval),
            ResourceKind::Detail => {
                state.selected_coin.is_some() && state.detail.is_due(now, interval)
            }
            ResourceKind::Chart => {
                state.selected_coin.is_some() && state.chart.is_due(now, interval)
            }
        }
    }

    /// Message of the last failed load of `resource`, cleared on success
    pub async fn last_error(&self, resource: ResourceKind) -> Option<String> {
        let state = self.state.read().await;
        let error = match resource {
            ResourceKind::List => state.coins.last_error(),
            ResourceKind::Detail => state.detail.last_error(),
            ResourceKind::Chart => state.chart.last_error(),
        };
        error.map(str::to_string)
    }

    pub async fn list_last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.coins.last_updated()
    }

    pub async fn detail_last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.detail.last_updated()
    }

    pub async fn chart_last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.chart.last_updated()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let now = Utc::now();
        let interval = self.refresh_interval;
        let state = self.state.read().await;
        StoreSnapshot {
            coins: state.coins.data().cloned().unwrap_or_default(),
            coin_detail: state.detail.data().cloned(),
            chart_data: state.chart.data().cloned(),
            query: state.query.clone(),
            selected_coin: state.selected_coin.clone(),
            chart_days: state.chart_days,
            list_status: state.coins.status(now, interval),
            detail_status: state.detail.status(now, interval),
            chart_status: state.chart.status(now, interval),
            list_last_updated: state.coins.last_updated(),
            detail_last_updated: state.detail.last_updated(),
        }
    }

    /// Gets load metrics including latency percentiles and success rate
    pub async fn metrics(&self, resource: ResourceKind) -> LoadMetrics {
        self.collector(resource).get_metrics().await
    }
}
