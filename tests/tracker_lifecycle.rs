use coin_tracker_sdk::{
    constants::POPULAR_COINS, ChartRange, CoinTracker, FavoritesPolicy, HealthStatus,
    ResourceKind, SortOrder, SortType, SourceKind, TrackerConfig, TrackerEvent,
};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(dir: &TempDir) -> TrackerConfig {
    TrackerConfig::default()
        .with_mock(7, Duration::ZERO)
        .with_storage_path(dir.path().join("prefs.json"))
}

#[tokio::test]
async fn test_full_session_with_mock_source() {
    let dir = TempDir::new().unwrap();
    let tracker = CoinTracker::from_config(mock_config(&dir)).unwrap();
    let mut events = tracker.subscribe();

    tracker.start().await;
    assert_eq!(tracker.source_name(), "mock");
    assert_eq!(tracker.visible_coins().await.len(), POPULAR_COINS.len());
    assert!(matches!(
        events.recv().await.unwrap(),
        TrackerEvent::CoinsUpdated { count, .. } if count == POPULAR_COINS.len()
    ));

    tracker.set_sort(SortType::Name, SortOrder::Asc).await;
    let names: Vec<String> = tracker
        .visible_coins()
        .await
        .into_iter()
        .map(|c| c.name.to_lowercase())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    assert!(tracker.toggle_favorite("tron").await.unwrap());
    assert_eq!(tracker.visible_coins().await[0].id, "tron");

    tracker.search("  BIT ").await;
    let visible = tracker.visible_coins().await;
    assert!(visible.iter().all(|c| {
        c.name.to_lowercase().contains("bit") || c.symbol.to_lowercase().contains("bit")
    }));
    assert!(visible.iter().any(|c| c.id == "bitcoin"));

    tracker.select_coin("ethereum", ChartRange::Quarter).await;
    assert_eq!(tracker.store().coin_detail().await.unwrap().id, "ethereum");
    assert_eq!(tracker.store().chart_data().await.unwrap().len(), 91);

    assert_eq!(tracker.health_check().await.status, HealthStatus::Healthy);
    let metrics = tracker.metrics(ResourceKind::List).await;
    assert_eq!(metrics.failed_requests, 0);
    assert!(metrics.total_requests >= 1);

    tracker.shutdown().await.unwrap();
    assert!(dir.path().join("prefs.json").exists());
}

#[tokio::test]
async fn test_preferences_restored_from_disk() {
    let dir = TempDir::new().unwrap();

    let first = CoinTracker::from_config(mock_config(&dir)).unwrap();
    first.set_sort(SortType::Volume, SortOrder::Asc).await;
    first.toggle_favorite("solana").await.unwrap();
    first.toggle_favorite("cardano").await.unwrap();
    first.toggle_favorite("cardano").await.unwrap();
    first.shutdown().await.unwrap();
    drop(first);

    let second = CoinTracker::from_config(mock_config(&dir)).unwrap();
    second.start().await;

    let query = second.store().query().await;
    assert_eq!(query.sort_type, SortType::Volume);
    assert_eq!(query.sort_order, SortOrder::Asc);
    assert!(second.is_favorite("solana"));
    assert!(!second.is_favorite("cardano"));
    assert_eq!(second.visible_coins().await[0].id, "solana");
    second.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_preferences_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("prefs.json"), b"not json").unwrap();

    let tracker = CoinTracker::from_config(mock_config(&dir)).unwrap();
    tracker.start().await;

    let query = tracker.store().query().await;
    assert_eq!(query.sort_type, SortType::MarketCap);
    assert_eq!(query.sort_order, SortOrder::Desc);
    assert_eq!(tracker.visible_coins().await.len(), POPULAR_COINS.len());
    tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_signed_out_favorites_rejected_under_require_auth() {
    let dir = TempDir::new().unwrap();
    let config = mock_config(&dir).with_favorites_policy(FavoritesPolicy::RequireAuth);
    let tracker = CoinTracker::from_config(config).unwrap();

    assert!(tracker.toggle_favorite("bitcoin").await.is_err());
    assert!(tracker.favorites().get_favorites().is_empty());
}

#[tokio::test]
async fn test_failover_serves_mock_data_when_coingecko_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = TrackerConfig::default()
        .with_source(SourceKind::Failover)
        .with_coingecko(server.uri(), None);
    let tracker = CoinTracker::from_config(config).unwrap();
    tracker.start().await;

    assert_eq!(tracker.source_name(), "failover");
    assert_eq!(tracker.visible_coins().await.len(), POPULAR_COINS.len());
    assert!(tracker.store().last_error(ResourceKind::List).await.is_none());
    tracker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_coingecko_outage_reports_list_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let config = TrackerConfig::default()
        .with_source(SourceKind::CoinGecko)
        .with_coingecko(server.uri(), None);
    let tracker = CoinTracker::from_config(config).unwrap();
    let mut events = tracker.subscribe();
    tracker.start().await;

    assert!(tracker.visible_coins().await.is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        TrackerEvent::LoadFailed { resource: ResourceKind::List, .. }
    ));
    assert_eq!(tracker.health_check().await.status, HealthStatus::Unhealthy);
    tracker.shutdown().await.unwrap();
}
