//! Tracking engine collaborator interface
//!
//! The engine is a detection-then-tracking state machine driven exclusively
//! by events submitted from the orchestration loop. Only one thread ever
//! calls `process_event`, so implementations need no internal locking.

use crate::{CameraIntrinsics, EdgeSiteList, ImageBuffer, KeypointList, Pose, TrackError};

/// Phase discriminant of the tracking state machine
///
/// The small-integer representation is the wire payload of the status
/// channel; the numeric values are part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum TrackerPhase {
    /// Constructed, not yet started
    #[default]
    Init = 0,
    /// Started, waiting for the first input frame
    WaitingForInput = 1,
    /// Searching for the pattern in incoming frames
    Detecting = 2,
    /// Pattern found, model pose is being tracked
    TrackingModel = 3,
    /// Terminal event received
    Finished = 4,
}

impl TrackerPhase {
    /// Status-channel representation
    pub fn code(self) -> i8 {
        self as i8
    }
}

/// Events submitted by the orchestration loop
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// First frame is available; begin detection on it
    SelectInput { image: ImageBuffer },

    /// One loop iteration's input
    InputReady {
        image: ImageBuffer,
        camera: CameraIntrinsics,
        iteration: u64,
    },

    /// Terminal event; no further `InputReady` may follow
    Finished,
}

/// Payload carried only by the `TrackingModel` phase
#[derive(Debug, Clone, PartialEq)]
pub struct TrackModel {
    /// Current model pose in the camera frame
    pub pose: Pose,

    /// 6x6 pose covariance, row-major
    pub covariance: [f64; 36],
}

impl TrackModel {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            covariance: [0.0; 36],
        }
    }
}

impl Default for TrackModel {
    fn default() -> Self {
        Self::new(Pose::default())
    }
}

/// Pattern detection collaborator
///
/// Decodes a coded pattern (QR code, data matrix) from an image. The decoding
/// mathematics are opaque to the orchestration core.
pub trait PatternDetector: Send {
    /// Run detection on an image; true if a pattern was located
    fn detect(&mut self, image: &ImageBuffer) -> bool;

    /// Last successfully decoded message, if any
    fn message(&self) -> Option<&str>;
}

/// Tracking state machine collaborator
pub trait TrackingEngine: Send {
    /// Advance the state machine by one event
    fn process_event(&mut self, event: TrackerEvent);

    /// Current phase discriminant
    fn current_phase(&self) -> TrackerPhase;

    /// Typed access to the tracking-phase payload
    ///
    /// # Errors
    /// `TrackError::NotTracking` when the engine is in any other phase.
    /// Callers must check `current_phase` first; relying on the error for
    /// control flow is a contract violation.
    fn tracking_state(&self) -> Result<&TrackModel, TrackError>;

    /// Populate the per-feature edge-site diagnostic record
    fn fill_edge_sites(&self, out: &mut EdgeSiteList);

    /// Populate the per-feature keypoint diagnostic record
    fn fill_keypoints(&self, out: &mut KeypointList);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_codes_are_stable() {
        assert_eq!(TrackerPhase::Init.code(), 0);
        assert_eq!(TrackerPhase::WaitingForInput.code(), 1);
        assert_eq!(TrackerPhase::Detecting.code(), 2);
        assert_eq!(TrackerPhase::TrackingModel.code(), 3);
        assert_eq!(TrackerPhase::Finished.code(), 4);
    }
}
