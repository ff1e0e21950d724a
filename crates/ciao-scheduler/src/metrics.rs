//! Scheduler metrics: ambient observability via simple atomic counters
//! plus an uptime clock, no external metrics backend.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SchedulerMetrics {
    pub frames_forwarded: AtomicU64,
    pub frames_discarded: AtomicU64,
    pub placements: AtomicU64,
    pub start_failures: AtomicU64,
    started_at: DateTime<Utc>,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            frames_forwarded: AtomicU64::new(0),
            frames_discarded: AtomicU64::new(0),
            placements: AtomicU64::new(0),
            start_failures: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_forwarded(&self) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placed(&self) {
        self.placements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_start_failure(&self) {
        self.start_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = SchedulerMetrics::new();
        assert_eq!(m.frames_forwarded.load(Ordering::Relaxed), 0);
        assert_eq!(m.placements.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn record_placed_increments_counter() {
        let m = SchedulerMetrics::new();
        m.record_placed();
        m.record_placed();
        assert_eq!(m.placements.load(Ordering::Relaxed), 2);
    }
}
