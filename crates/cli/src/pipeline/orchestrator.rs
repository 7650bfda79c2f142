//! Pipeline orchestrator - coordinates capture, tracking and publishing.
//!
//! The loop runs at the configured frequency against the latest-frame
//! buffer: each iteration takes a snapshot, advances the engine by one
//! event, dispatches the six output channels, then sleeps out the remainder
//! of the period. An overrun iteration starts the next one immediately;
//! there is no catch-up burst. Shutdown is level-triggered and checked once
//! per iteration, so an in-flight iteration always completes and the final
//! status payload carries the terminal phase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture::{FrameBuffer, FrameSource, MockFeedConfig, MockFrameFeed};
use contracts::{
    CameraIntrinsics, ChannelName, DetectorKind, FrameHeader, StampedHeader, TrackerBlueprint,
    TrackerEvent, TrackerPhase, TrackingEngine,
};
use observability::record_loop_iteration;
use publisher::PublisherSet;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracking::{build_detector, AutoTracker, DataMatrixDetector, ModelDescription, QrCodeDetector};

use super::display::DebugDisplay;
use super::PipelineStats;

/// Poll interval while waiting for the first frame
const FIRST_FRAME_POLL: Duration = Duration::from_millis(2);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The tracker blueprint configuration
    pub blueprint: TrackerBlueprint,

    /// Maximum number of loop iterations (None = unlimited)
    pub max_iterations: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Level-triggered stop request.
///
/// Once triggered it stays set; the loop observes it between iterations,
/// never in the middle of one.
#[derive(Clone, Default)]
struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    publishers: PublisherSet,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        let publishers = PublisherSet::new(&config.blueprint.channels);
        Self { config, publishers }
    }

    /// Output channels of this pipeline.
    ///
    /// Consumers subscribed before [`run`](Self::run) see payloads from the
    /// first iteration on.
    pub fn publishers(&self) -> &PublisherSet {
        &self.publishers
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let Self { config, publishers } = self;
        let blueprint = &config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Model resources are loaded before anything starts; failure here
        // is fatal
        let description_path = blueprint.model.description_path();
        info!(path = %description_path.display(), "Loading model description");
        let model = ModelDescription::load(&description_path)
            .with_context(|| format!("Failed to load model '{}'", description_path.display()))?;

        // Tracking engine
        let detector = build_detector(blueprint.detector.kind);
        let mut engine = AutoTracker::new(blueprint.tracker.variant, detector, model);

        info!(
            tracker = ?blueprint.tracker.variant,
            detector = ?blueprint.detector.kind,
            "Tracking engine created"
        );

        // Synthetic feed carrying the encoded pattern payload
        let pattern = match blueprint.detector.kind {
            DetectorKind::QrCode => QrCodeDetector::encode(&blueprint.feed.message),
            DetectorKind::DataMatrix => DataMatrixDetector::encode(&blueprint.feed.message),
        };
        let feed = MockFrameFeed::new(MockFeedConfig {
            frequency_hz: blueprint.feed.frequency_hz,
            image_width: blueprint.feed.image_width,
            image_height: blueprint.feed.image_height,
            pattern,
            camera: CameraIntrinsics::default(),
        });
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();

        // Configured log taps on the output channels
        let tap_handles = attach_log_taps(&publishers, &blueprint.channels.log_taps);

        info!(
            log_taps = tap_handles.len(),
            "Output channels ready"
        );

        // Shutdown sources: signals and the optional timeout
        let shutdown = ShutdownFlag::default();
        let signal_handle = spawn_signal_listener(shutdown.clone());
        let timeout_handle = config.timeout.map(|timeout| {
            let flag = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(timeout_secs = timeout.as_secs(), "Pipeline timeout reached");
                flag.trigger();
            })
        });

        source.start();
        engine.start();

        info!(
            frequency_hz = blueprint.pacing.frequency_hz,
            max_iterations = ?config.max_iterations,
            "Pipeline running"
        );

        // Wait for the first frame
        while !buffer.is_ready() && !shutdown.is_triggered() {
            tokio::time::sleep(FIRST_FRAME_POLL).await;
        }

        let display = DebugDisplay::new(blueprint.pacing.debug_display);
        let period = blueprint.pacing.period();
        let reference_frame = blueprint.tracker.reference_frame.clone();

        let mut stats = PipelineStats::default();
        let mut iteration: u64 = 0;
        let mut last_header = FrameHeader::default();
        let mut last_phase = engine.current_phase();

        // First frame kicks off detection; `last_phase` keeps its pre-event
        // value so a detection on this frame is counted like any other
        if let Some(first) = buffer.try_snapshot() {
            info!(frame_id = first.header.frame_id, "First frame received");
            engine.process_event(TrackerEvent::SelectInput {
                image: first.image.clone(),
            });
        }

        while !shutdown.is_triggered() {
            let started = Instant::now();

            // The buffer never empties once ready; absent a snapshot we are
            // still waiting and the first-frame loop above was interrupted
            let Some(snapshot) = buffer.try_snapshot() else {
                break;
            };

            iteration += 1;
            engine.process_event(TrackerEvent::InputReady {
                image: snapshot.image.clone(),
                camera: snapshot.camera,
                iteration,
            });

            let phase = engine.current_phase();
            if last_phase != TrackerPhase::TrackingModel && phase == TrackerPhase::TrackingModel {
                stats.detections += 1;
            }
            if last_phase == TrackerPhase::TrackingModel && phase == TrackerPhase::Detecting {
                stats.tracking_losses += 1;
            }
            last_phase = phase;

            display.show(&snapshot, phase);

            last_header = snapshot.header;
            let header = StampedHeader::new(snapshot.header, reference_frame.as_str());
            publishers.dispatch(&engine, &header, engine.pattern_message());

            let elapsed = started.elapsed();
            let overrun = elapsed >= period;
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            record_loop_iteration(elapsed_ms, overrun, phase);
            stats.loop_metrics.update(elapsed_ms, overrun, phase);

            if let Some(max) = config.max_iterations {
                if iteration >= max {
                    info!(iterations = iteration, "Reached max iterations limit");
                    break;
                }
            }

            if overrun {
                debug!(
                    iteration,
                    elapsed_ms = format!("{:.2}", elapsed_ms),
                    "Iteration overran its period"
                );
                // Still cede control once per iteration so the signal and
                // timeout tasks run even under sustained overrun
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(period - elapsed).await;
            }
        }

        // Terminal event, then one last dispatch so the status channel
        // carries the terminal phase
        engine.process_event(TrackerEvent::Finished);
        let final_header = StampedHeader::new(last_header, reference_frame.as_str());
        publishers.dispatch(&engine, &final_header, engine.pattern_message());

        info!("Shutting down pipeline...");
        source.stop();

        // Let attached taps drain briefly before tearing them down
        tokio::time::sleep(Duration::from_millis(20)).await;
        for handle in tap_handles {
            handle.abort();
        }
        signal_handle.abort();
        if let Some(handle) = timeout_handle {
            handle.abort();
        }

        stats.iterations = iteration;
        stats.final_phase = engine.current_phase();
        stats.duration = start_time.elapsed();
        stats.channel_metrics = publishers.metrics();

        info!(
            iterations = stats.iterations,
            duration_secs = stats.duration.as_secs_f64(),
            loop_hz = format!("{:.2}", stats.loop_hz()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Install Ctrl+C and SIGTERM handlers that trigger the shutdown flag
fn spawn_signal_listener(shutdown: ShutdownFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        warn!("Received shutdown signal, stopping after current iteration");
        shutdown.trigger();
    })
}

/// Spawn one logging subscriber task per configured channel
fn attach_log_taps(publishers: &PublisherSet, taps: &[ChannelName]) -> Vec<JoinHandle<()>> {
    taps.iter()
        .map(|tap| match tap {
            ChannelName::Pose => spawn_tap(publishers.pose().subscribe(), "pose", |p| {
                format!(
                    "frame={} t=({:.3}, {:.3}, {:.3})",
                    p.header.frame.frame_id,
                    p.pose.translation.x,
                    p.pose.translation.y,
                    p.pose.translation.z
                )
            }),
            ChannelName::PoseCovariance => spawn_tap(
                publishers.pose_covariance().subscribe(),
                "pose_covariance",
                |p| {
                    format!(
                        "frame={} var={:.2e}",
                        p.header.frame.frame_id, p.covariance[0]
                    )
                },
            ),
            ChannelName::Status => spawn_tap(publishers.status().subscribe(), "status", |code| {
                format!("phase_code={}", code)
            }),
            ChannelName::EdgeSites => spawn_tap(
                publishers.edge_sites().subscribe(),
                "edge_sites",
                |list| format!("frame={} sites={}", list.header.frame.frame_id, list.sites.len()),
            ),
            ChannelName::Keypoints => spawn_tap(
                publishers.keypoints().subscribe(),
                "keypoints",
                |list| {
                    format!(
                        "frame={} points={}",
                        list.header.frame.frame_id,
                        list.points.len()
                    )
                },
            ),
            ChannelName::PatternMessage => spawn_tap(
                publishers.pattern_message().subscribe(),
                "pattern_message",
                |message| message.clone(),
            ),
        })
        .collect()
}

fn spawn_tap<T: Clone + Send + 'static>(
    mut rx: tokio::sync::broadcast::Receiver<T>,
    name: &'static str,
    describe: impl Fn(&T) -> String + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    info!(channel = name, payload = %describe(&payload), "channel payload");
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(channel = name, missed, "log tap lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ChannelsConfig, ConfigVersion, DetectorConfig, FeedConfig, LoopConfig, ModelConfig,
        TrackerBlueprint, TrackerConfig,
    };

    fn test_blueprint(model_dir: &std::path::Path, frequency_hz: f64) -> TrackerBlueprint {
        std::fs::write(model_dir.join("pattern.wrl"), "#VRML V2.0 utf8\n").unwrap();
        TrackerBlueprint {
            version: ConfigVersion::V1,
            model: ModelConfig {
                name: "pattern".into(),
                path: model_dir.display().to_string(),
            },
            tracker: TrackerConfig::default(),
            detector: DetectorConfig::default(),
            pacing: LoopConfig {
                frequency_hz,
                debug_display: false,
            },
            channels: ChannelsConfig::default(),
            feed: FeedConfig {
                frequency_hz: 120.0,
                image_width: 64,
                image_height: 64,
                message: "pipeline test payload".into(),
            },
        }
    }

    #[tokio::test]
    async fn pipeline_run_paces_and_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = test_blueprint(dir.path(), 50.0);
        let period = blueprint.pacing.period();

        let pipeline = Pipeline::new(PipelineConfig {
            blueprint,
            max_iterations: Some(10),
            timeout: None,
            metrics_port: None,
        });

        // Subscribe before the run; arrival instants measure the pace
        let mut pose_rx = pipeline.publishers().pose().subscribe();
        let arrivals = tokio::spawn(async move {
            let mut stamps = Vec::new();
            while pose_rx.recv().await.is_ok() {
                stamps.push(Instant::now());
            }
            stamps
        });

        let stats = pipeline.run().await.unwrap();

        assert_eq!(stats.iterations, 10);
        assert_eq!(stats.final_phase, TrackerPhase::Finished);
        // Pattern found on the very first frame counts as a detection
        assert_eq!(stats.detections, 1);
        assert_eq!(stats.tracking_losses, 0);

        let stamps = arrivals.await.unwrap();
        assert_eq!(stamps.len(), 10);
        for pair in stamps.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap >= period.mul_f64(0.5),
                "pose payloads arrived faster than the loop period: {:?}",
                gap
            );
        }
    }

    #[tokio::test]
    async fn overrun_loop_still_observes_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        // Period far below per-iteration cost, so every iteration overruns
        let blueprint = test_blueprint(dir.path(), 100_000.0);

        let pipeline = Pipeline::new(PipelineConfig {
            blueprint,
            max_iterations: None,
            timeout: Some(Duration::from_millis(100)),
            metrics_port: None,
        });

        let stats = tokio::time::timeout(Duration::from_secs(5), pipeline.run())
            .await
            .expect("pipeline never observed the timeout shutdown")
            .unwrap();

        assert_eq!(stats.final_phase, TrackerPhase::Finished);
        assert!(stats.iterations > 0);
    }

    #[test]
    fn shutdown_flag_is_level_triggered() {
        let flag = ShutdownFlag::default();
        assert!(!flag.is_triggered());

        flag.trigger();
        assert!(flag.is_triggered());

        // Stays set
        flag.trigger();
        assert!(flag.is_triggered());

        let clone = flag.clone();
        assert!(clone.is_triggered());
    }
}
