//! Channel - one broadcast output with consumer gating

use std::sync::Arc;

use metrics::counter;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::metrics::ChannelMetrics;

/// One output channel over a bounded broadcast queue.
///
/// Payloads are only constructed and sent while at least one consumer is
/// subscribed; a slow consumer lags and loses old payloads rather than
/// back-pressuring the publishing loop.
pub struct Channel<T: Clone> {
    name: &'static str,
    tx: broadcast::Sender<T>,
    metrics: Arc<ChannelMetrics>,
}

impl<T: Clone> Channel<T> {
    /// Create a channel with the given queue capacity.
    pub fn new(name: &'static str, queue_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(queue_capacity);
        Self {
            name,
            tx,
            metrics: Arc::new(ChannelMetrics::new()),
        }
    }

    /// Stable channel label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Attach a new consumer.
    ///
    /// The consumer receives payloads published after this call; it never
    /// sees history.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        let rx = self.tx.subscribe();
        debug!(channel = self.name, consumers = self.tx.receiver_count(), "consumer attached");
        rx
    }

    /// Whether at least one consumer is currently attached.
    pub fn has_consumers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Publish the payload produced by `build`, if anyone is listening.
    ///
    /// `build` runs only when a consumer is attached, so callers can put
    /// payload construction cost inside the closure. Returns true when the
    /// payload was delivered to at least one consumer.
    pub fn publish_with(&self, build: impl FnOnce() -> T) -> bool {
        if !self.has_consumers() {
            self.metrics.inc_skipped_count();
            trace!(channel = self.name, "no consumers, payload skipped");
            return false;
        }

        match self.tx.send(build()) {
            Ok(receivers) => {
                self.metrics.inc_publish_count();
                counter!("pattern_tracker_publishes_total", "channel" => self.name).increment(1);
                trace!(channel = self.name, receivers, "payload published");
                true
            }
            Err(_) => {
                // Last consumer detached between the gate check and the send
                self.metrics.inc_failure_count();
                false
            }
        }
    }

    /// Shared metrics handle for this channel.
    pub fn metrics(&self) -> &Arc<ChannelMetrics> {
        &self.metrics
    }
}
