//! Store statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Point-in-time store statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of get requests
    pub total_gets: u64,

    /// Number of hits
    pub hits: u64,

    /// Number of misses
    pub misses: u64,

    /// Total number of set requests
    pub total_sets: u64,

    /// Entries removed explicitly
    pub removals: u64,

    /// Entries dropped by capacity, expiry or clear
    pub evictions: u64,

    /// Current number of entries
    pub entry_count: usize,

    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,

    /// Average get latency in microseconds
    pub avg_get_latency_us: Option<f64>,

    /// Average set latency in microseconds
    pub avg_set_latency_us: Option<f64>,
}

/// Thread-safe statistics collector
#[derive(Debug, Default)]
pub struct StatsCollector {
    total_gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    total_sets: AtomicU64,
    removals: AtomicU64,
    evictions: AtomicU64,

    total_get_latency_ns: AtomicU64,
    total_set_latency_ns: AtomicU64,
}

impl StatsCollector {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a hit
    pub fn record_hit(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss
    pub fn record_miss(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a set
    pub fn record_set(&self) {
        self.total_sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an explicit removal
    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` evictions
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Record get latency measured from `start`
    pub fn record_get_latency(&self, start: Instant) {
        self.total_get_latency_ns
            .fetch_add(elapsed_ns(start), Ordering::Relaxed);
    }

    /// Record set latency measured from `start`
    pub fn record_set_latency(&self, start: Instant) {
        self.total_set_latency_ns
            .fetch_add(elapsed_ns(start), Ordering::Relaxed);
    }

    /// Snapshot the counters
    pub fn snapshot(&self, entry_count: usize) -> CacheStats {
        let total_gets = self.total_gets.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let total_sets = self.total_sets.load(Ordering::Relaxed);

        let hit_rate = if total_gets > 0 {
            hits as f64 / total_gets as f64
        } else {
            0.0
        };

        let avg_get_latency_us = average_us(&self.total_get_latency_ns, total_gets);
        let avg_set_latency_us = average_us(&self.total_set_latency_ns, total_sets);

        CacheStats {
            total_gets,
            hits,
            misses: self.misses.load(Ordering::Relaxed),
            total_sets,
            removals: self.removals.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entry_count,
            hit_rate,
            avg_get_latency_us,
            avg_set_latency_us,
        }
    }
}

/// Shared stats collector
pub type SharedStatsCollector = Arc<StatsCollector>;

fn elapsed_ns(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

fn average_us(total_ns: &AtomicU64, count: u64) -> Option<f64> {
    (count > 0).then(|| total_ns.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0)
}
