//! Lock-free retrieval metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug)]
pub struct RetrievalMetrics {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

/// Point-in-time view of [`RetrievalMetrics`]. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub successful_queries: u64,
    pub failed_queries: u64,
    pub success_rate: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub average_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl Default for RetrievalMetrics {
    fn default() -> Self {
        Self {
            total: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            max_latency_us: AtomicU64::new(0),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn micros_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}

impl RetrievalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, success: bool, latency: Duration, cache_hit: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
        self.min_latency_us.fetch_min(us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min = self.min_latency_us.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_queries: total,
            successful_queries: successful,
            failed_queries: self.failed.load(Ordering::Relaxed),
            success_rate: percent(successful, total),
            cache_hits,
            cache_misses,
            cache_hit_rate: percent(cache_hits, cache_hits + cache_misses),
            average_latency_ms: if total == 0 {
                0.0
            } else {
                micros_to_ms(total_latency / total)
            },
            min_latency_ms: if min == u64::MAX { 0.0 } else { micros_to_ms(min) },
            max_latency_ms: micros_to_ms(self.max_latency_us.load(Ordering::Relaxed)),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.successful,
            &self.failed,
            &self.cache_hits,
            &self.cache_misses,
            &self.total_latency_us,
            &self.max_latency_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.min_latency_us.store(u64::MAX, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_aggregates() {
        let metrics = RetrievalMetrics::new();
        metrics.record(true, Duration::from_millis(10), false);
        metrics.record(true, Duration::from_millis(30), true);
        metrics.record(false, Duration::from_millis(20), false);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_queries, 3);
        assert_eq!(snap.failed_queries, 1);
        assert!((snap.success_rate - 66.666).abs() < 0.01);
        assert!((snap.cache_hit_rate - 33.333).abs() < 0.01);
        assert!((snap.average_latency_ms - 20.0).abs() < 0.001);
        assert!((snap.min_latency_ms - 10.0).abs() < 0.001);
        assert!((snap.max_latency_ms - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_reset_and_empty_snapshot() {
        let metrics = RetrievalMetrics::new();
        metrics.record(true, Duration::from_millis(5), true);
        metrics.reset();
        let snap = metrics.snapshot();
        assert_eq!(snap.total_queries, 0);
        assert_eq!(snap.min_latency_ms, 0.0);
        assert_eq!(snap.success_rate, 0.0);
    }
}
