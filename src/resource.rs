//! Load state of a single remotely fetched resource
//!
//! The coin list, the coin detail and the chart each go through the same
//! cycle. A `Resource` allows one load at a time and tags every load with a
//! [`LoadTicket`] so a response that arrives after a reset is dropped.
//!
//! ```text
//! Idle ──begin_load──▶ Loading ──complete──▶ Loaded ──begin_load──▶ Loading
//!                         │                                  ▲
//!                         └──fail──▶ Error ──begin_load──────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stored lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// State as observed at a given instant
///
/// `LoadedStale` is never stored; it is `Loaded` data older than the
/// refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Idle,
    Loading,
    Loaded,
    LoadedStale,
    Error,
}

/// Proof that a load was started; redeemed by `complete` or `fail`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a load ticket must be redeemed with complete() or fail()"]
pub struct LoadTicket {
    generation: u64,
}

/// Data plus load bookkeeping for one resource
#[derive(Debug, Clone)]
pub struct Resource<T> {
    state: ResourceState,
    data: Option<T>,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_failed: Option<DateTime<Utc>>,
    generation: u64,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            state: ResourceState::Idle,
            data: None,
            last_updated: None,
            last_error: None,
            last_failed: None,
            generation: 0,
        }
    }
}

impl<T> Resource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the resource as loading
    ///
    /// # Returns
    /// `None` if a load is already in flight, otherwise a ticket for the
    /// new load
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if self.state == ResourceState::Loading {
            return None;
        }
        self.state = ResourceState::Loading;
        Some(LoadTicket {
            generation: self.generation,
        })
    }

    /// Replaces the data with a successful response
    ///
    /// # Returns
    /// False if the ticket predates the last reset and the data was dropped
    pub fn complete(&mut self, ticket: LoadTicket, data: T, now: DateTime<Utc>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.data = Some(data);
        self.last_updated = Some(now);
        self.last_error = None;
        self.last_failed = None;
        self.state = ResourceState::Loaded;
        true
    }

    /// Records a failed load; data from an earlier load is kept
    pub fn fail(
        &mut self,
        ticket: LoadTicket,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.last_error = Some(message.into());
        self.last_failed = Some(now);
        self.state = ResourceState::Error;
        true
    }

    /// Drops data and history; tickets handed out before are invalidated
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.data = None;
        self.last_updated = None;
        self.last_error = None;
        self.last_failed = None;
        self.state = ResourceState::Idle;
    }

    fn accepts(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.generation && self.state == ResourceState::Loading
    }

    /// True if a poll should start a new load now
    ///
    /// A failed resource is retried one interval after the failure, the same
    /// cadence as a successful one.
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.state {
            ResourceState::Idle => true,
            ResourceState::Loading => false,
            ResourceState::Loaded => elapsed_at_least(self.last_updated, now, interval),
            ResourceState::Error => elapsed_at_least(self.last_failed, now, interval),
        }
    }

    pub fn status(&self, now: DateTime<Utc>, refresh_interval: Duration) -> ResourceStatus {
        match self.state {
            ResourceState::Idle => ResourceStatus::Idle,
            ResourceState::Loading => ResourceStatus::Loading,
            ResourceState::Error => ResourceStatus::Error,
            ResourceState::Loaded if self.is_stale(now, refresh_interval) => {
                ResourceStatus::LoadedStale
            }
            ResourceState::Loaded => ResourceStatus::Loaded,
        }
    }

    /// Stale once strictly older than the refresh interval
    fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        let Some(last) = self.last_updated else {
            return true;
        };
        let Ok(interval) = chrono::Duration::from_std(interval) else {
            return false;
        };
        now.signed_duration_since(last) > interval
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ResourceState::Loading
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

fn elapsed_at_least(since: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: Duration) -> bool {
    let Some(since) = since else {
        return true;
    };
    let Ok(interval) = chrono::Duration::from_std(interval) else {
        return false;
    };
    now.signed_duration_since(since) >= interval
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(30);

    #[test]
    fn test_second_begin_load_is_rejected() {
        let mut resource: Resource<u32> = Resource::new();
        let ticket = resource.begin_load();
        assert!(ticket.is_some());
        assert!(resource.begin_load().is_none());
        assert!(resource.is_loading());
    }

    #[test]
    fn test_complete_replaces_data() {
        let now = Utc::now();
        let mut resource = Resource::new();

        let ticket = resource.begin_load().unwrap();
        assert!(resource.complete(ticket, vec![1, 2, 3], now));
        let ticket = resource.begin_load().unwrap();
        assert!(resource.complete(ticket, vec![4], now));

        assert_eq!(resource.data(), Some(&vec![4]));
        assert_eq!(resource.state(), ResourceState::Loaded);
        assert_eq!(resource.last_updated(), Some(now));
    }

    #[test]
    fn test_fail_keeps_previous_data() {
        let now = Utc::now();
        let mut resource = Resource::new();
        let ticket = resource.begin_load().unwrap();
        resource.complete(ticket, "first", now);

        let ticket = resource.begin_load().unwrap();
        assert!(resource.fail(ticket, "Network error", now));

        assert_eq!(resource.state(), ResourceState::Error);
        assert_eq!(resource.data(), Some(&"first"));
        assert_eq!(resource.last_error(), Some("Network error"));
        assert_eq!(resource.last_updated(), Some(now));
    }

    #[test]
    fn test_reset_discards_late_response() {
        let mut resource = Resource::new();
        let ticket = resource.begin_load().unwrap();
        resource.reset();

        assert!(!resource.complete(ticket, 7, Utc::now()));
        assert_eq!(resource.data(), None);
        assert_eq!(resource.state(), ResourceState::Idle);

        // A fresh load after the reset is accepted
        let ticket = resource.begin_load().unwrap();
        assert!(resource.complete(ticket, 8, Utc::now()));
        assert_eq!(resource.data(), Some(&8));
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let mut resource = Resource::new();
        assert!(resource.is_due(now, INTERVAL));

        let ticket = resource.begin_load().unwrap();
        assert!(!resource.is_due(now, INTERVAL));

        resource.complete(ticket, (), now);
        assert!(!resource.is_due(now + chrono::Duration::seconds(29), INTERVAL));
        assert!(resource.is_due(now + chrono::Duration::seconds(30), INTERVAL));

        let failed_at = now + chrono::Duration::seconds(40);
        let ticket = resource.begin_load().unwrap();
        resource.fail(ticket, "boom", failed_at);
        assert!(!resource.is_due(failed_at, INTERVAL));
        assert!(!resource.is_due(failed_at + chrono::Duration::seconds(29), INTERVAL));
        assert!(resource.is_due(failed_at + chrono::Duration::seconds(30), INTERVAL));
    }

    #[test]
    fn test_reset_after_failure_is_due_at_once() {
        let now = Utc::now();
        let mut resource: Resource<()> = Resource::new();
        let ticket = resource.begin_load().unwrap();
        resource.fail(ticket, "boom", now);

        resource.reset();
        assert!(resource.is_due(now, INTERVAL));
    }

    #[test]
    fn test_status_derives_stale() {
        let now = Utc::now();
        let mut resource = Resource::new();
        assert_eq!(resource.status(now, INTERVAL), ResourceStatus::Idle);

        let ticket = resource.begin_load().unwrap();
        assert_eq!(resource.status(now, INTERVAL), ResourceStatus::Loading);

        resource.complete(ticket, (), now);
        assert_eq!(resource.status(now, INTERVAL), ResourceStatus::Loaded);
        assert_eq!(
            resource.status(now + chrono::Duration::seconds(30), INTERVAL),
            ResourceStatus::Loaded
        );
        assert_eq!(
            resource.status(now + chrono::Duration::minutes(1), INTERVAL),
            ResourceStatus::LoadedStale
        );
    }
}
