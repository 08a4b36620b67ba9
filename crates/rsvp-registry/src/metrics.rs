//! Registry metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Registry metrics.
#[derive(Debug)]
pub struct RegistryMetrics {
    /// Total ids allocated.
    pub allocated: AtomicU64,

    /// Total ids released (double releases are not counted).
    pub released: AtomicU64,

    /// Candidate ids skipped because they were still live.
    pub collisions: AtomicU64,

    /// Values handed to a receiver.
    pub delivered: AtomicU64,

    /// Sends rejected because the id was unknown or its receiver gone.
    pub closed: AtomicU64,

    /// Sends abandoned because the cancellation token fired.
    pub cancelled: AtomicU64,

    /// Sends abandoned because the deadline passed.
    pub deadline_exceeded: AtomicU64,

    /// Current live entries.
    pub live_entries: AtomicU64,

    created_at: Instant,
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self {
            allocated: AtomicU64::new(0),
            released: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            deadline_exceeded: AtomicU64::new(0),
            live_entries: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    pub fn record_allocated(&self, live: usize) {
        self.allocated.fetch_add(1, Ordering::Relaxed);
        self.set_live_entries(live);
    }

    pub fn record_released(&self, live: usize) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.set_live_entries(live);
    }

    pub fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deadline_exceeded(&self) {
        self.deadline_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    fn set_live_entries(&self, live: usize) {
        self.live_entries.store(live as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_secs: self.uptime_secs(),
            allocated: self.allocated.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            deadline_exceeded: self.deadline_exceeded.load(Ordering::Relaxed),
            live_entries: self.live_entries.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub allocated: u64,
    pub released: u64,
    pub collisions: u64,
    pub delivered: u64,
    pub closed: u64,
    pub cancelled: u64,
    pub deadline_exceeded: u64,
    pub live_entries: u64,
}

impl MetricsSnapshot {
    /// Total send attempts, successful or not.
    pub fn send_attempts(&self) -> u64 {
        self.delivered + self.closed + self.cancelled + self.deadline_exceeded
    }

    /// Fraction of send attempts that delivered a value.
    pub fn delivery_ratio(&self) -> f64 {
        let attempts = self.send_attempts();
        if attempts == 0 {
            return 0.0;
        }
        self.delivered as f64 / attempts as f64
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
