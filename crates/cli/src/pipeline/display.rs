//! Optional debug display.
//!
//! A headless stand-in for an on-screen overlay: when enabled it traces
//! every displayed frame with its dimensions and the current phase. The
//! pipeline runs identically with the display disabled.

use contracts::{FrameSnapshot, TrackerPhase};
use tracing::{debug, info};

pub struct DebugDisplay {
    enabled: bool,
}

impl DebugDisplay {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            info!("debug display enabled");
        }
        Self { enabled }
    }

    /// Render one frame with the current phase overlay.
    pub fn show(&self, snapshot: &FrameSnapshot, phase: TrackerPhase) {
        if !self.enabled {
            return;
        }
        debug!(
            frame_id = snapshot.header.frame_id,
            timestamp = snapshot.header.timestamp,
            width = snapshot.image.width,
            height = snapshot.image.height,
            phase = ?phase,
            "frame displayed"
        );
    }
}
