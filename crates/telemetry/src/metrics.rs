//! In-process metrics.
//!
//! Counters and gauges are plain atomics read by the `/metrics` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram with fixed millisecond buckets.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, +Inf
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10_000, 30_000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns `(upper_bound_ms, count)` pairs; the overflow bucket has bound `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the VQA backend.
#[derive(Debug, Default)]
pub struct Metrics {
    // Session lifecycle
    pub uploads_received: Counter,
    pub uploads_rejected: Counter,
    pub sessions_created: Counter,
    pub sessions_expired: Counter,
    pub sessions_completed: Counter,
    pub sessions_removed: Counter,
    pub orphans_purged: Counter,

    // Questions
    pub questions_received: Counter,
    pub answers_recorded: Counter,
    pub inference_errors: Counter,

    // Storage
    pub storage_errors: Counter,
    pub file_delete_errors: Counter,

    pub inference_latency_ms: Histogram,

    pub active_sessions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uploads_received: u64,
    pub uploads_rejected: u64,
    pub sessions_created: u64,
    pub sessions_expired: u64,
    pub sessions_completed: u64,
    pub sessions_removed: u64,
    pub orphans_purged: u64,
    pub questions_received: u64,
    pub answers_recorded: u64,
    pub inference_errors: u64,
    pub storage_errors: u64,
    pub file_delete_errors: u64,
    pub inference_count: u64,
    pub inference_latency_mean_ms: f64,
    /// `(upper_bound_ms, count)` per bucket
    pub inference_latency_buckets: Vec<(u64, u64)>,
    pub active_sessions: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uploads_received: self.uploads_received.get(),
            uploads_rejected: self.uploads_rejected.get(),
            sessions_created: self.sessions_created.get(),
            sessions_expired: self.sessions_expired.get(),
            sessions_completed: self.sessions_completed.get(),
            sessions_removed: self.sessions_removed.get(),
            orphans_purged: self.orphans_purged.get(),
            questions_received: self.questions_received.get(),
            answers_recorded: self.answers_recorded.get(),
            inference_errors: self.inference_errors.get(),
            storage_errors: self.storage_errors.get(),
            file_delete_errors: self.file_delete_errors.get(),
            inference_count: self.inference_latency_ms.count(),
            inference_latency_mean_ms: self.inference_latency_ms.mean(),
            inference_latency_buckets: self.inference_latency_ms.buckets(),
            active_sessions: self.active_sessions.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
