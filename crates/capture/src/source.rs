//! FrameSource - wires a feed subscription into the frame buffer.

use std::sync::Arc;

use contracts::{FrameFeed, FrameSnapshot};
use metrics::counter;
use tracing::{debug, trace};

use crate::FrameBuffer;

/// Subscribes to a [`FrameFeed`] and publishes every delivery into a
/// [`FrameBuffer`].
///
/// The callback does nothing beyond constructing the snapshot and the O(1)
/// buffer write, so the feed's capture thread is never blocked on tracking
/// or publishing work.
pub struct FrameSource {
    buffer: Arc<FrameBuffer>,
    feed: Box<dyn FrameFeed>,
}

impl FrameSource {
    /// Create a source over the given feed, writing into `buffer`.
    pub fn new(feed: Box<dyn FrameFeed>, buffer: Arc<FrameBuffer>) -> Self {
        Self { buffer, feed }
    }

    /// Subscribe to the feed and start publishing into the buffer.
    ///
    /// Idempotent: the underlying feed registers the callback once.
    pub fn start(&self) {
        let buffer = Arc::clone(&self.buffer);
        debug!("frame source starting");
        self.feed.subscribe(Arc::new(move |image, camera, header| {
            trace!(
                frame_id = header.frame_id,
                timestamp = header.timestamp,
                "frame received"
            );
            counter!("pattern_tracker_frames_received_total").increment(1);
            buffer.set(FrameSnapshot::new(image, camera, header));
        }));
    }

    /// Stop the underlying feed.
    pub fn stop(&self) {
        debug!("frame source stopping");
        self.feed.stop();
    }

    /// Whether the feed is currently delivering.
    pub fn is_active(&self) -> bool {
        self.feed.is_active()
    }

    /// Shared handle to the buffer this source fills.
    pub fn buffer(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.feed.stop();
    }
}
