//! Complete Pipeline Demo
//!
//! Demonstrates the full tracking loop without the CLI: a synthetic frame
//! feed delivers pattern-carrying frames, the engine detects and tracks,
//! and subscriber tasks print what arrives on the output channels.
//!
//! Run with: cargo run --bin complete_pipeline

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capture::{FrameBuffer, FrameSource, MockFeedConfig, MockFrameFeed};
use config_loader::ConfigLoader;
use contracts::{
    CameraIntrinsics, ChannelsConfig, DetectorKind, StampedHeader, TrackerEvent, TrackerVariant,
    TrackingEngine,
};
use observability::LoopMetricsAggregator;
use publisher::PublisherSet;
use tracking::{build_detector, AutoTracker, ModelDescription, QrCodeDetector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Complete Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading blueprint config");
        Some(ConfigLoader::load_from_path(std::path::Path::new(&path))?)
    } else {
        None
    };

    let (loop_period, feed_message) = match &blueprint {
        Some(bp) => (bp.pacing.period(), bp.feed.message.clone()),
        None => (
            Duration::from_secs_f64(1.0 / 30.0),
            "demo pattern payload".to_string(),
        ),
    };

    // ==== Stage 2: Model description and engine ====
    // The demo writes its own throwaway description file
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("pattern.wrl");
    let mut file = std::fs::File::create(&model_path)?;
    writeln!(file, "#VRML V2.0 utf8")?;
    let model = ModelDescription::load(&model_path)?;

    let mut engine = AutoTracker::new(
        TrackerVariant::EdgeKlt,
        build_detector(DetectorKind::QrCode),
        model,
    );

    // ==== Stage 3: Synthetic feed into the latest-frame buffer ====
    let feed = MockFrameFeed::new(MockFeedConfig {
        frequency_hz: 60.0,
        image_width: 640,
        image_height: 480,
        pattern: QrCodeDetector::encode(&feed_message),
        camera: CameraIntrinsics::default(),
    });
    let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
    let buffer = source.buffer();

    // ==== Stage 4: Output channels with printing subscribers ====
    let publishers = PublisherSet::new(&ChannelsConfig::default());

    let mut status_rx = publishers.status().subscribe();
    tokio::spawn(async move {
        while let Ok(code) = status_rx.recv().await {
            tracing::info!(phase_code = code, "status");
        }
    });

    let mut pose_rx = publishers.pose().subscribe();
    tokio::spawn(async move {
        while let Ok(pose) = pose_rx.recv().await {
            tracing::info!(
                frame_id = pose.header.frame.frame_id,
                x = format!("{:.3}", pose.pose.translation.x),
                y = format!("{:.3}", pose.pose.translation.y),
                z = format!("{:.3}", pose.pose.translation.z),
                "pose"
            );
        }
    });

    let mut message_rx = publishers.pattern_message().subscribe();
    tokio::spawn(async move {
        while let Ok(message) = message_rx.recv().await {
            tracing::info!(message = %message, "pattern message");
        }
    });

    // ==== Stage 5: Run the loop ====
    source.start();
    engine.start();

    while !buffer.is_ready() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let first = buffer.try_snapshot().expect("buffer is ready");
    engine.process_event(TrackerEvent::SelectInput {
        image: first.image.clone(),
    });

    let target_iterations = 100u64;
    let mut loop_metrics = LoopMetricsAggregator::new();

    tracing::info!(
        iterations = target_iterations,
        period_ms = loop_period.as_secs_f64() * 1000.0,
        "Running pipeline"
    );

    for iteration in 1..=target_iterations {
        let started = Instant::now();
        let snapshot = buffer.try_snapshot().expect("buffer never empties");

        engine.process_event(TrackerEvent::InputReady {
            image: snapshot.image.clone(),
            camera: snapshot.camera,
            iteration,
        });

        let header = StampedHeader::new(snapshot.header, "tracked_object");
        publishers.dispatch(&engine, &header, engine.pattern_message());

        let elapsed = started.elapsed();
        loop_metrics.update(
            elapsed.as_secs_f64() * 1000.0,
            elapsed >= loop_period,
            engine.current_phase(),
        );

        if elapsed < loop_period {
            tokio::time::sleep(loop_period - elapsed).await;
        }
    }

    // ==== Stage 6: Shutdown ====
    engine.process_event(TrackerEvent::Finished);
    let last = buffer.try_snapshot().expect("buffer never empties");
    publishers.dispatch(
        &engine,
        &StampedHeader::new(last.header, "tracked_object"),
        engine.pattern_message(),
    );
    source.stop();

    // Let subscriber tasks drain
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("{}", loop_metrics.summary());
    for (name, metrics) in publishers.metrics() {
        println!(
            "channel {}: published={}, skipped={}",
            name, metrics.publish_count, metrics.skipped_count
        );
    }

    tracing::info!("Demo finished");
    Ok(())
}
