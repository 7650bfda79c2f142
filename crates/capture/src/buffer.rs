//! Latest-frame buffer shared between capture and loop threads.

use std::sync::{Arc, Mutex};

use contracts::FrameSnapshot;

/// Holds the most recent [`FrameSnapshot`].
///
/// Written only by the capture side, read-and-copied only by the loop side.
/// The lock guards a single `Arc` swap or clone, so the critical section is
/// O(1) and independent of image size; readers can never observe a snapshot
/// whose image and calibration come from different arrivals, because the
/// `Arc` is fully constructed before it enters the buffer.
///
/// Readiness is `latest.is_some()`: it becomes true on the first `set` and
/// never reverts.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    latest: Mutex<Option<Arc<FrameSnapshot>>>,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the held snapshot.
    ///
    /// The previous snapshot's `Arc` is dropped here, but copies handed out
    /// by [`try_snapshot`](Self::try_snapshot) stay valid and unchanged.
    pub fn set(&self, snapshot: FrameSnapshot) {
        let snapshot = Arc::new(snapshot);
        // Poisoning only occurs if a writer panicked mid-swap; the swap
        // itself cannot panic, so recover the inner value.
        let mut latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *latest = Some(snapshot);
    }

    /// Copy out the held snapshot, if any arrived yet.
    pub fn try_snapshot(&self) -> Option<Arc<FrameSnapshot>> {
        let latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        latest.clone()
    }

    /// Whether at least one snapshot has ever been stored.
    pub fn is_ready(&self) -> bool {
        self.try_snapshot().is_some()
    }
}
