//! Search input debouncing

use crate::store::CoinCollectionStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Applies a search query to the store once typing has paused
///
/// Each call to [`SearchDebouncer::push`] supersedes the previous one; only
/// the last query of a burst reaches the store, `delay` after it was typed.
pub struct SearchDebouncer {
    store: Arc<CoinCollectionStore>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(store: Arc<CoinCollectionStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `query` to be applied after the quiet period
    pub fn push(&self, query: impl Into<String>) {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let store = self.store.clone();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            tracing::debug!(query = %query, "Applying search query");
            store.set_search_query(query).await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drops the pending query, if any
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// True while a query is waiting to be applied
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;

    fn debouncer(delay_ms: u64) -> (Arc<CoinCollectionStore>, SearchDebouncer) {
        let store = Arc::new(CoinCollectionStore::new(
            Arc::new(MockSource::new()),
            "usd",
            Duration::from_secs(30),
        ));
        let debouncer = SearchDebouncer::new(store.clone(), Duration::from_millis(delay_ms));
        (store, debouncer)
    }

    #[tokio::test]
    async fn test_only_last_query_applied() {
        let (store, debouncer) = debouncer(60);

        debouncer.push("b");
        debouncer.push("bi");
        debouncer.push("bit");
        assert!(debouncer.is_pending());
        assert_eq!(store.query().await.search_query, "");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.query().await.search_query, "bit");
        assert!(!debouncer.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_query() {
        let (store, debouncer) = debouncer(40);

        debouncer.push("eth");
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.query().await.search_query, "");
    }
}
