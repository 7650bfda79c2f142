//! Per-channel publish metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single output channel
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Payloads delivered to at least one consumer
    publish_count: AtomicU64,
    /// Dispatches skipped because no consumer was attached
    skipped_count: AtomicU64,
    /// Sends that failed because the last consumer detached mid-dispatch
    failure_count: AtomicU64,
}

impl ChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    pub fn inc_publish_count(&self) {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_count(&self) {
        self.skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of all counters (for reporting)
    pub fn snapshot(&self) -> ChannelMetricsSnapshot {
        ChannelMetricsSnapshot {
            publish_count: self.publish_count(),
            skipped_count: self.skipped_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Point-in-time copy of a channel's counters
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelMetricsSnapshot {
    pub publish_count: u64,
    pub skipped_count: u64,
    pub failure_count: u64,
}
