//! Load metrics collection and reporting
//!
//! Tracks latency percentiles and success rates for each store resource.

use crate::types::ResourceKind;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Metrics for a single resource
#[derive(Debug, Clone, Serialize)]
pub struct LoadMetrics {
    /// Resource the loads were for
    pub resource: ResourceKind,
    /// 50th percentile latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of loads tracked
    pub total_requests: u64,
    /// Number of failed loads
    pub failed_requests: u64,
}

impl LoadMetrics {
    /// Creates metrics with no data
    pub fn empty(resource: ResourceKind) -> Self {
        Self {
            resource,
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_requests: 0,
            failed_requests: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects and computes metrics for one resource
#[derive(Clone)]
pub struct MetricsCollector {
    resource: ResourceKind,
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    pub fn new(resource: ResourceKind) -> Self {
        Self {
            resource,
            counters: Arc::new(RwLock::new(Counters {
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                ..Default::default()
            })),
        }
    }

    /// Records a load with its duration and outcome
    pub async fn record_request(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total += 1;
        if !success {
            counters.failed += 1;
        }

        // Rolling window
        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> LoadMetrics {
        let counters = self.counters.read().await;
        if counters.samples.is_empty() {
            return LoadMetrics::empty(self.resource);
        }

        // Percentiles only cover successful loads
        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        LoadMetrics {
            resource: self.resource,
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate: (counters.total - counters.failed) as f64 / counters.total as f64,
            total_requests: counters.total,
            failed_requests: counters.failed,
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_collector() {
        let collector = MetricsCollector::new(ResourceKind::List);

        collector.record_request(Duration::from_millis(100), true).await;
        collector.record_request(Duration::from_millis(200), true).await;
        collector.record_request(Duration::from_millis(150), false).await;

        let metrics = collector.get_metrics().await;

        assert_eq!(metrics.resource, ResourceKind::List);
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
        assert_eq!(metrics.latency_p99_ms, 200.0);
    }

    #[tokio::test]
    async fn test_window_is_bounded() {
        let collector = MetricsCollector::new(ResourceKind::Chart);
        for _ in 0..(MAX_SAMPLES + 20) {
            collector.record_request(Duration::from_millis(5), true).await;
        }

        assert_eq!(collector.counters.read().await.samples.len(), MAX_SAMPLES);
        assert_eq!(
            collector.get_metrics().await.total_requests,
            (MAX_SAMPLES + 20) as u64
        );
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 6.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
