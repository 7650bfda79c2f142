//! # Tracking
//!
//! The detection-then-tracking state machine and its collaborators.
//!
//! [`AutoTracker`] implements [`contracts::TrackingEngine`]: it searches
//! incoming frames for a coded pattern, estimates and then tracks the model
//! pose, and falls back to detection when tracking degrades. The pose and
//! feature mathematics here are deliberately lightweight; the orchestration
//! contract (events in, phase and payload out) is the load-bearing part.

mod detector;
mod engine;
mod model;

pub use detector::{build_detector, DataMatrixDetector, Detector, QrCodeDetector};
pub use engine::AutoTracker;
pub use model::ModelDescription;
