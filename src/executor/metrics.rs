//! Task execution statistics
//!
//! Per-task counters plus a fixed-bucket latency histogram, all atomics so
//! that profile readers never block running tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Number of histogram buckets
const HISTOGRAM_BUCKETS: usize = 8;

/// Upper bounds of the buckets, in microseconds
const BUCKET_BOUNDS_US: [u64; HISTOGRAM_BUCKETS] =
    [1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000, u64::MAX];

/// Latency histogram with fixed buckets
///
/// Buckets: <1ms, <5ms, <10ms, <50ms, <100ms, <500ms, <1s, >1s
#[derive(Debug, Default)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; HISTOGRAM_BUCKETS],
    /// Sum of all latencies in microseconds
    sum_us: AtomicU64,
    count: AtomicU64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a latency value
    pub fn record(&self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.sum_us.fetch_add(us, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let bucket = BUCKET_BOUNDS_US
            .iter()
            .position(|bound| us < *bound)
            .unwrap_or(HISTOGRAM_BUCKETS - 1);
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Get the average latency
    pub fn average(&self) -> Duration {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.sum_us.load(Ordering::Relaxed) / count)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of every recorded latency
    pub fn total(&self) -> Duration {
        Duration::from_micros(self.sum_us.load(Ordering::Relaxed))
    }

    /// Estimate a percentile as the upper bound of the bucket containing it
    pub fn percentile(&self, p: f64) -> Duration {
        let total = self.count.load(Ordering::Relaxed);
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0) as u64;
        let mut cumulative = 0u64;
        for (bucket, bound) in self.buckets.iter().zip(BUCKET_BOUNDS_US) {
            cumulative += bucket.load(Ordering::Relaxed);
            if cumulative >= target {
                return Duration::from_micros(bound);
            }
        }
        Duration::from_secs(1)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }

    /// Bucket counts, fastest bucket first
    pub fn buckets(&self) -> [u64; HISTOGRAM_BUCKETS] {
        std::array::from_fn(|i| self.buckets[i].load(Ordering::Relaxed))
    }
}

/// Statistics of one runtime task
#[derive(Debug, Default)]
pub struct TaskStats {
    /// Number of completed runs (loop bodies run once per round)
    pub runs: AtomicU64,
    /// Rows published across all runs
    pub rows: AtomicU64,
    /// Time spent executing
    pub latency: LatencyHistogram,
}

impl TaskStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one completed run
    pub fn record(&self, rows: usize, elapsed: Duration) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.rows.fetch_add(rows as u64, Ordering::Relaxed);
        self.latency.record(elapsed);
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> TaskStatsSnapshot {
        TaskStatsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            total_time: self.latency.total(),
        }
    }
}

/// Point-in-time copy of [`TaskStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStatsSnapshot {
    pub runs: u64,
    pub rows: u64,
    pub total_time: Duration,
}
