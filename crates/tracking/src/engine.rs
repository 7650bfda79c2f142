//! AutoTracker - the detection-then-tracking state machine
//!
//! Driven exclusively by [`TrackerEvent`]s from the orchestration loop.
//! Detection searches each frame for the coded pattern; once found the
//! engine estimates a model pose by back-projecting the pattern location
//! through the camera intrinsics and smooths it across iterations. Losing
//! the pattern for several consecutive frames drops the engine back to
//! detection.

use contracts::{
    CameraIntrinsics, EdgeSite, EdgeSiteList, ImageBuffer, Keypoint, KeypointList, PatternDetector,
    Pose, TrackError, TrackModel, TrackerEvent, TrackerPhase, TrackerVariant, TrackingEngine,
    Translation,
};
use metrics::counter;
use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::detector::Detector;
use crate::model::ModelDescription;

/// Consecutive frames without the pattern before tracking is declared lost.
const MAX_CONSECUTIVE_MISSES: u32 = 5;

/// Assumed distance of the pattern plane from the camera (meters).
const NOMINAL_DEPTH_M: f64 = 0.5;

/// Exponential smoothing factor applied to translation updates.
const POSE_SMOOTHING: f64 = 0.35;

/// Baseline variance on the covariance diagonal.
const BASE_VARIANCE: f64 = 1e-4;

/// Internal phase representation; only `TrackingModel` carries a payload.
enum PhaseState {
    Init,
    WaitingForInput,
    Detecting,
    TrackingModel(TrackState),
    Finished,
}

struct TrackState {
    model: TrackModel,
    /// Consecutive frames without a pattern hit
    misses: u32,
    /// Dimensions of the last processed frame, for feature placement
    frame_size: (u32, u32),
    camera: CameraIntrinsics,
}

/// Detection-then-tracking engine over a coded pattern.
pub struct AutoTracker {
    variant: TrackerVariant,
    detector: Detector,
    model: ModelDescription,
    phase: PhaseState,
    camera: CameraIntrinsics,
}

impl AutoTracker {
    pub fn new(variant: TrackerVariant, detector: Detector, model: ModelDescription) -> Self {
        Self {
            variant,
            detector,
            model,
            phase: PhaseState::Init,
            camera: CameraIntrinsics::default(),
        }
    }

    /// Transition from `Init` to `WaitingForInput`.
    ///
    /// Idempotent once started; events are ignored until this is called.
    pub fn start(&mut self) {
        if let PhaseState::Init = self.phase {
            info!(model = self.model.name(), "tracker started");
            self.phase = PhaseState::WaitingForInput;
        }
    }

    /// Last decoded pattern message, if any frame has carried one.
    pub fn pattern_message(&self) -> Option<&str> {
        self.detector.message()
    }

    /// Configured tracker variant.
    pub fn variant(&self) -> TrackerVariant {
        self.variant
    }

    fn handle_select_input(&mut self, image: ImageBuffer) {
        match self.phase {
            PhaseState::WaitingForInput | PhaseState::Detecting => {}
            _ => {
                debug!("select_input ignored in current phase");
                return;
            }
        }

        if self.detector.detect(&image) {
            counter!("pattern_tracker_detections_total").increment(1);
            info!("pattern found on initial frame");
            self.phase = PhaseState::TrackingModel(self.begin_tracking(&image, self.camera));
        } else {
            debug!("initial frame has no pattern, detecting");
            self.phase = PhaseState::Detecting;
        }
    }

    fn handle_input_ready(&mut self, image: ImageBuffer, camera: CameraIntrinsics, iteration: u64) {
        self.camera = camera;
        match self.current_phase() {
            TrackerPhase::WaitingForInput | TrackerPhase::Detecting => {
                if self.detector.detect(&image) {
                    counter!("pattern_tracker_detections_total").increment(1);
                    info!(iteration, "pattern detected");
                    self.phase = PhaseState::TrackingModel(self.begin_tracking(&image, camera));
                } else {
                    self.phase = PhaseState::Detecting;
                }
            }
            TrackerPhase::TrackingModel => {
                let detected = self.detector.detect(&image);
                let mut lost = false;
                if let PhaseState::TrackingModel(state) = &mut self.phase {
                    if detected {
                        state.misses = 0;
                        state.frame_size = (image.width, image.height);
                        state.camera = camera;
                        Self::refine_pose(state, &image, camera);
                    } else {
                        state.misses += 1;
                        Self::write_covariance(state);
                        lost = state.misses >= MAX_CONSECUTIVE_MISSES;
                    }
                }
                if lost {
                    counter!("pattern_tracker_tracking_losses_total").increment(1);
                    warn!(iteration, "tracking lost, re-detecting");
                    self.phase = PhaseState::Detecting;
                }
            }
            TrackerPhase::Init | TrackerPhase::Finished => {
                debug!(iteration, "input ignored in current phase");
            }
        }
    }

    fn begin_tracking(&self, image: &ImageBuffer, camera: CameraIntrinsics) -> TrackState {
        let mut state = TrackState {
            model: TrackModel::new(Pose {
                translation: Self::back_project_center(image, camera),
                ..Pose::default()
            }),
            misses: 0,
            frame_size: (image.width, image.height),
            camera,
        };
        Self::write_covariance(&mut state);
        state
    }

    /// Back-project the image center at the nominal pattern depth.
    fn back_project_center(image: &ImageBuffer, camera: CameraIntrinsics) -> Translation {
        let u = image.width as f64 / 2.0;
        let v = image.height as f64 / 2.0;
        let point = Vector3::new(
            (u - camera.cx) / camera.fx * NOMINAL_DEPTH_M,
            (v - camera.cy) / camera.fy * NOMINAL_DEPTH_M,
            NOMINAL_DEPTH_M,
        );
        Translation {
            x: point.x,
            y: point.y,
            z: point.z,
        }
    }

    /// Low-pass the tracked translation toward the current observation.
    fn refine_pose(state: &mut TrackState, image: &ImageBuffer, camera: CameraIntrinsics) {
        let target = Self::back_project_center(image, camera);
        let current = Vector3::new(
            state.model.pose.translation.x,
            state.model.pose.translation.y,
            state.model.pose.translation.z,
        );
        let observed = Vector3::new(target.x, target.y, target.z);
        let smoothed = current + (observed - current) * POSE_SMOOTHING;

        state.model.pose.translation = Translation {
            x: smoothed.x,
            y: smoothed.y,
            z: smoothed.z,
        };
        Self::write_covariance(state);
    }

    /// Diagonal covariance, inflated while the pattern is missing.
    fn write_covariance(state: &mut TrackState) {
        let inflation = (1 + state.misses) as f64;
        let variance = BASE_VARIANCE * inflation * inflation;
        state.model.covariance = [0.0; 36];
        for i in 0..6 {
            state.model.covariance[i * 6 + i] = variance;
        }
    }

    fn project(state: &TrackState, offset_x: f64, offset_y: f64) -> (f64, f64) {
        let t = &state.model.pose.translation;
        let camera = &state.camera;
        let u = camera.fx * (t.x + offset_x) / t.z + camera.cx;
        let v = camera.fy * (t.y + offset_y) / t.z + camera.cy;
        (u, v)
    }
}

impl TrackingEngine for AutoTracker {
    fn process_event(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::SelectInput { image } => self.handle_select_input(image),
            TrackerEvent::InputReady {
                image,
                camera,
                iteration,
            } => self.handle_input_ready(image, camera, iteration),
            TrackerEvent::Finished => {
                if !matches!(self.phase, PhaseState::Finished) {
                    info!("tracker finished");
                    self.phase = PhaseState::Finished;
                }
            }
        }
    }

    fn current_phase(&self) -> TrackerPhase {
        match self.phase {
            PhaseState::Init => TrackerPhase::Init,
            PhaseState::WaitingForInput => TrackerPhase::WaitingForInput,
            PhaseState::Detecting => TrackerPhase::Detecting,
            PhaseState::TrackingModel(_) => TrackerPhase::TrackingModel,
            PhaseState::Finished => TrackerPhase::Finished,
        }
    }

    fn tracking_state(&self) -> Result<&TrackModel, TrackError> {
        match &self.phase {
            PhaseState::TrackingModel(state) => Ok(&state.model),
            _ => Err(TrackError::NotTracking {
                phase: self.current_phase().code(),
            }),
        }
    }

    fn fill_edge_sites(&self, out: &mut EdgeSiteList) {
        out.sites.clear();
        let PhaseState::TrackingModel(state) = &self.phase else {
            return;
        };
        if self.variant == TrackerVariant::Klt {
            return;
        }

        // Ring of edge sites around the projected model center
        let radius = state.frame_size.0.min(state.frame_size.1) as f64 / 8.0;
        let count = 12;
        for i in 0..count {
            let angle = std::f64::consts::TAU * i as f64 / count as f64;
            let (u, v) = Self::project(
                state,
                angle.cos() * radius / state.camera.fx * state.model.pose.translation.z,
                angle.sin() * radius / state.camera.fy * state.model.pose.translation.z,
            );
            out.sites.push(EdgeSite {
                x: u,
                y: v,
                suppress: if state.misses > 0 { 1 } else { 0 },
            });
        }
    }

    fn fill_keypoints(&self, out: &mut KeypointList) {
        out.points.clear();
        let PhaseState::TrackingModel(state) = &self.phase else {
            return;
        };
        if self.variant == TrackerVariant::Edge {
            return;
        }

        // 3x3 grid of keypoints with stable ids
        let spacing = state.frame_size.0.min(state.frame_size.1) as f64 / 10.0;
        for row in 0..3i32 {
            for col in 0..3i32 {
                let dx = (col - 1) as f64 * spacing / state.camera.fx
                    * state.model.pose.translation.z;
                let dy = (row - 1) as f64 * spacing / state.camera.fy
                    * state.model.pose.translation.z;
                let (u, v) = Self::project(state, dx, dy);
                out.points.push(Keypoint {
                    id: row * 3 + col,
                    x: u,
                    y: v,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{build_detector, QrCodeDetector};
    use bytes::Bytes;
    use contracts::{DetectorKind, PixelFormat};
    use std::io::Write;

    fn test_model() -> ModelDescription {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.wrl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#VRML V2.0 utf8").unwrap();
        ModelDescription::load(&path).unwrap()
    }

    fn tracker(variant: TrackerVariant) -> AutoTracker {
        AutoTracker::new(variant, build_detector(DetectorKind::QrCode), test_model())
    }

    fn image(with_pattern: bool) -> ImageBuffer {
        let mut data = vec![128u8; 64 * 64];
        if with_pattern {
            let pattern = QrCodeDetector::encode("unit test payload");
            data[16..16 + pattern.len()].copy_from_slice(&pattern);
        }
        ImageBuffer {
            width: 64,
            height: 64,
            format: PixelFormat::Mono8,
            data: Bytes::from(data),
        }
    }

    fn input(with_pattern: bool, iteration: u64) -> TrackerEvent {
        TrackerEvent::InputReady {
            image: image(with_pattern),
            camera: CameraIntrinsics::default(),
            iteration,
        }
    }

    #[test]
    fn start_moves_to_waiting() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        assert_eq!(engine.current_phase(), TrackerPhase::Init);
        engine.start();
        assert_eq!(engine.current_phase(), TrackerPhase::WaitingForInput);
        engine.start();
        assert_eq!(engine.current_phase(), TrackerPhase::WaitingForInput);
    }

    #[test]
    fn events_before_start_are_ignored() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.process_event(input(true, 1));
        assert_eq!(engine.current_phase(), TrackerPhase::Init);
    }

    #[test]
    fn select_input_with_pattern_enters_tracking() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        engine.process_event(TrackerEvent::SelectInput { image: image(true) });
        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);
        assert_eq!(engine.pattern_message(), Some("unit test payload"));
    }

    #[test]
    fn select_input_without_pattern_enters_detecting() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        engine.process_event(TrackerEvent::SelectInput {
            image: image(false),
        });
        assert_eq!(engine.current_phase(), TrackerPhase::Detecting);

        engine.process_event(input(true, 1));
        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);
    }

    #[test]
    fn tracking_state_outside_tracking_is_an_error() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        let err = engine.tracking_state().unwrap_err();
        assert!(matches!(
            err,
            TrackError::NotTracking { phase } if phase == TrackerPhase::WaitingForInput.code()
        ));
    }

    #[test]
    fn pattern_loss_falls_back_to_detection() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        engine.process_event(TrackerEvent::SelectInput { image: image(true) });
        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);

        // Survives a few misses, then drops back to detection
        for i in 0..MAX_CONSECUTIVE_MISSES - 1 {
            engine.process_event(input(false, i as u64));
            assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);
        }
        engine.process_event(input(false, 99));
        assert_eq!(engine.current_phase(), TrackerPhase::Detecting);

        // Pattern coming back restores tracking
        engine.process_event(input(true, 100));
        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);
    }

    #[test]
    fn misses_inflate_covariance() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        engine.process_event(input(true, 1));
        let baseline = engine.tracking_state().unwrap().covariance[0];

        engine.process_event(input(false, 2));
        let inflated = engine.tracking_state().unwrap().covariance[0];
        assert!(inflated > baseline);
    }

    #[test]
    fn tracked_pose_sits_at_nominal_depth() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        for i in 0..10 {
            engine.process_event(input(true, i));
        }
        let state = engine.tracking_state().unwrap();
        assert!((state.pose.translation.z - NOMINAL_DEPTH_M).abs() < 1e-9);
        assert_eq!(state.pose.rotation, Default::default());
    }

    #[test]
    fn finished_is_terminal() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();
        engine.process_event(input(true, 1));
        engine.process_event(TrackerEvent::Finished);
        assert_eq!(engine.current_phase(), TrackerPhase::Finished);

        engine.process_event(input(true, 2));
        assert_eq!(engine.current_phase(), TrackerPhase::Finished);
        assert!(engine.tracking_state().is_err());
    }

    #[test]
    fn diagnostics_are_empty_outside_tracking() {
        let mut engine = tracker(TrackerVariant::EdgeKlt);
        engine.start();

        let mut sites = EdgeSiteList::default();
        let mut points = KeypointList::default();
        engine.fill_edge_sites(&mut sites);
        engine.fill_keypoints(&mut points);
        assert!(sites.sites.is_empty());
        assert!(points.points.is_empty());
    }

    #[test]
    fn diagnostics_respect_tracker_variant() {
        let mut sites = EdgeSiteList::default();
        let mut points = KeypointList::default();

        let mut edge_only = tracker(TrackerVariant::Edge);
        edge_only.start();
        edge_only.process_event(input(true, 1));
        edge_only.fill_edge_sites(&mut sites);
        edge_only.fill_keypoints(&mut points);
        assert_eq!(sites.sites.len(), 12);
        assert!(points.points.is_empty());

        let mut klt_only = tracker(TrackerVariant::Klt);
        klt_only.start();
        klt_only.process_event(input(true, 1));
        klt_only.fill_edge_sites(&mut sites);
        klt_only.fill_keypoints(&mut points);
        assert!(sites.sites.is_empty());
        assert_eq!(points.points.len(), 9);
        // Stable ids across refills
        assert_eq!(points.points[0].id, 0);
        assert_eq!(points.points[8].id, 8);
    }
}
