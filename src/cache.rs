//! Time-bounded cache of HTTP response bodies
//!
//! Keys are the full request URL (endpoint plus query parameters), so two
//! requests only share an entry when every parameter matches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CachedBody {
    body: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedBody {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// Thread-safe response cache with a TTL per entry
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedBody>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached body for `key` if it has not expired
    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh() => {
                tracing::debug!(key, "Response cache hit");
                Some(entry.body.clone())
            }
            Some(_) => {
                tracing::debug!(key, "Response cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Stores `body` under `key` for `ttl`
    ///
    /// Expired entries are swept on every insert.
    pub async fn insert(&self, key: impl Into<String>, body: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh());
        entries.insert(
            key.into(),
            CachedBody {
                body,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drops every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_then_expire() {
        let cache = ResponseCache::new();
        cache
            .insert("/coins/bitcoin", "{}".to_string(), Duration::from_millis(50))
            .await;

        assert_eq!(cache.get("/coins/bitcoin").await.as_deref(), Some("{}"));
        assert_eq!(cache.get("/coins/ethereum").await, None);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("/coins/bitcoin").await, None);
    }

    #[tokio::test]
    async fn test_insert_sweeps_expired() {
        let cache = ResponseCache::new();
        cache.insert("a", "1".to_string(), Duration::ZERO).await;
        cache.insert("b", "2".to_string(), Duration::from_secs(60)).await;

        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
