//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需真实相机）
//! - 循环节拍与惰性发布行为验证

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_status_codes_match_wire_contract() {
        use contracts::TrackerPhase;

        assert_eq!(TrackerPhase::Init.code(), 0);
        assert_eq!(TrackerPhase::WaitingForInput.code(), 1);
        assert_eq!(TrackerPhase::Detecting.code(), 2);
        assert_eq!(TrackerPhase::TrackingModel.code(), 3);
        assert_eq!(TrackerPhase::Finished.code(), 4);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use capture::{
        FrameBuffer, FrameSource, ManualFeedHandle, ManualFrameFeed, MockFeedConfig, MockFrameFeed,
    };
    use contracts::{
        CameraIntrinsics, ChannelsConfig, DetectorKind, FrameHeader, ImageBuffer, PixelFormat,
        StampedHeader, TrackerEvent, TrackerPhase, TrackerVariant, TrackingEngine,
    };
    use publisher::PublisherSet;
    use tracking::{build_detector, AutoTracker, ModelDescription, QrCodeDetector};

    fn test_model() -> ModelDescription {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.wrl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#VRML V2.0 utf8").unwrap();
        ModelDescription::load(&path).unwrap()
    }

    fn test_engine() -> AutoTracker {
        let mut engine = AutoTracker::new(
            TrackerVariant::EdgeKlt,
            build_detector(DetectorKind::QrCode),
            test_model(),
        );
        engine.start();
        engine
    }

    fn pattern_image(with_pattern: bool, width: u32, height: u32) -> ImageBuffer {
        let mut data = vec![128u8; (width * height) as usize];
        if with_pattern {
            let pattern = QrCodeDetector::encode("e2e payload");
            data[64..64 + pattern.len()].copy_from_slice(&pattern);
        }
        ImageBuffer {
            width,
            height,
            format: PixelFormat::Mono8,
            data: Bytes::from(data),
        }
    }

    fn push_frame(handle: &ManualFeedHandle, frame_id: u64, with_pattern: bool) {
        handle.push(
            pattern_image(with_pattern, 64, 64),
            CameraIntrinsics::default(),
            FrameHeader {
                timestamp: frame_id as f64 / 60.0,
                frame_id,
            },
        );
    }

    fn header_for(frame: FrameHeader) -> StampedHeader {
        StampedHeader::new(frame, "tracked_object")
    }

    /// End-to-end test: MockFrameFeed -> FrameBuffer -> AutoTracker -> PublisherSet
    ///
    /// 验证完整的数据流：
    /// 1. MockFrameFeed 生成嵌入图案的帧
    /// 2. AutoTracker 检测图案并进入跟踪阶段
    /// 3. PublisherSet 向订阅者发布位姿与状态
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let feed = MockFrameFeed::new(MockFeedConfig {
            frequency_hz: 200.0,
            image_width: 64,
            image_height: 64,
            pattern: QrCodeDetector::encode("e2e payload"),
            camera: CameraIntrinsics::default(),
        });
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let mut engine = test_engine();
        let publishers = PublisherSet::new(&ChannelsConfig::default());
        let mut status_rx = publishers.status().subscribe();
        let mut pose_rx = publishers.pose().subscribe();
        let mut message_rx = publishers.pattern_message().subscribe();

        // Wait for the first frame
        let deadline = Instant::now() + Duration::from_secs(2);
        while !buffer.is_ready() {
            assert!(Instant::now() < deadline, "feed never delivered a frame");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let first = buffer.try_snapshot().unwrap();
        engine.process_event(TrackerEvent::SelectInput {
            image: first.image.clone(),
        });

        // Run a handful of loop iterations
        for iteration in 1..=10u64 {
            let snapshot = buffer.try_snapshot().unwrap();
            engine.process_event(TrackerEvent::InputReady {
                image: snapshot.image.clone(),
                camera: snapshot.camera,
                iteration,
            });
            publishers.dispatch(&engine, &header_for(snapshot.header), engine.pattern_message());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        source.stop();

        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);

        // Status observed the tracking phase
        let mut saw_tracking = false;
        while let Ok(code) = status_rx.try_recv() {
            if code == TrackerPhase::TrackingModel.code() {
                saw_tracking = true;
            }
        }
        assert!(saw_tracking, "status channel never carried the tracking phase");

        // Pose payloads flowed with stamped headers
        let pose = pose_rx.recv().await.unwrap();
        assert!(pose.header.frame.frame_id > 0);
        assert_eq!(pose.header.reference_frame, "tracked_object");
        assert!(pose.pose.translation.z > 0.0);

        // Decoded payload surfaced on the message channel
        assert_eq!(message_rx.recv().await.unwrap(), "e2e payload");
    }

    /// Unconsumed channels must not pay for payload construction.
    #[tokio::test]
    async fn test_unconsumed_channels_are_skipped() {
        let feed = ManualFrameFeed::new();
        let handle = feed.handle();
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let mut engine = test_engine();
        let publishers = PublisherSet::new(&ChannelsConfig::default());

        push_frame(&handle, 1, true);
        let snapshot = buffer.try_snapshot().unwrap();
        engine.process_event(TrackerEvent::SelectInput {
            image: snapshot.image.clone(),
        });
        engine.process_event(TrackerEvent::InputReady {
            image: snapshot.image.clone(),
            camera: snapshot.camera,
            iteration: 1,
        });
        publishers.dispatch(&engine, &header_for(snapshot.header), engine.pattern_message());

        for (name, metrics) in publishers.metrics() {
            assert_eq!(metrics.publish_count, 0, "channel '{}' published", name);
        }
        // Every channel that had a payload recorded the skip
        let metrics: std::collections::HashMap<_, _> =
            publishers.metrics().into_iter().collect();
        assert_eq!(metrics["status"].skipped_count, 1);
        assert_eq!(metrics["pose"].skipped_count, 1);
    }

    /// A stalled feed leaves the latest frame in place; the loop keeps
    /// reprocessing it rather than blocking.
    #[tokio::test]
    async fn test_snapshot_reuse_when_feed_stalls() {
        let feed = ManualFrameFeed::new();
        let handle = feed.handle();
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let mut engine = test_engine();
        let publishers = PublisherSet::new(&ChannelsConfig::default());
        let mut pose_rx = publishers.pose().subscribe();

        push_frame(&handle, 7, true);
        let first = buffer.try_snapshot().unwrap();
        engine.process_event(TrackerEvent::SelectInput {
            image: first.image.clone(),
        });

        // Several iterations over the single delivered frame
        for iteration in 1..=4u64 {
            let snapshot = buffer.try_snapshot().unwrap();
            assert_eq!(snapshot.header.frame_id, 7);
            engine.process_event(TrackerEvent::InputReady {
                image: snapshot.image.clone(),
                camera: snapshot.camera,
                iteration,
            });
            publishers.dispatch(&engine, &header_for(snapshot.header), engine.pattern_message());
        }

        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);
        for _ in 0..4 {
            let pose = pose_rx.recv().await.unwrap();
            assert_eq!(pose.header.frame.frame_id, 7);
        }
    }

    /// After the terminal event the status channel carries the terminal
    /// phase and nothing follows it.
    #[tokio::test]
    async fn test_terminal_status_is_last() {
        let feed = ManualFrameFeed::new();
        let handle = feed.handle();
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let mut engine = test_engine();
        let publishers = PublisherSet::new(&ChannelsConfig::default());
        let mut status_rx = publishers.status().subscribe();

        push_frame(&handle, 1, true);
        let snapshot = buffer.try_snapshot().unwrap();
        engine.process_event(TrackerEvent::SelectInput {
            image: snapshot.image.clone(),
        });
        engine.process_event(TrackerEvent::InputReady {
            image: snapshot.image.clone(),
            camera: snapshot.camera,
            iteration: 1,
        });
        publishers.dispatch(&engine, &header_for(snapshot.header), engine.pattern_message());

        // Terminal event, then the final dispatch
        engine.process_event(TrackerEvent::Finished);
        publishers.dispatch(&engine, &header_for(snapshot.header), engine.pattern_message());
        source.stop();

        let mut codes = Vec::new();
        while let Ok(code) = status_rx.try_recv() {
            codes.push(code);
        }
        assert_eq!(codes.last(), Some(&TrackerPhase::Finished.code()));
        assert_eq!(
            codes.iter().filter(|&&c| c == TrackerPhase::Finished.code()).count(),
            1
        );
    }

    /// Tracking loss after consecutive pattern-free frames, then recovery.
    #[tokio::test]
    async fn test_loss_and_redetection_over_the_wire() {
        let feed = ManualFrameFeed::new();
        let handle = feed.handle();
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let mut engine = test_engine();
        let publishers = PublisherSet::new(&ChannelsConfig::default());
        let mut status_rx = publishers.status().subscribe();

        let mut iteration = 0u64;
        let mut run_frame = |engine: &mut AutoTracker, frame_id: u64, with_pattern: bool| {
            push_frame(&handle, frame_id, with_pattern);
            let snapshot = buffer.try_snapshot().unwrap();
            iteration += 1;
            if iteration == 1 {
                engine.process_event(TrackerEvent::SelectInput {
                    image: snapshot.image.clone(),
                });
            }
            engine.process_event(TrackerEvent::InputReady {
                image: snapshot.image.clone(),
                camera: snapshot.camera,
                iteration,
            });
            publishers.dispatch(engine, &header_for(snapshot.header), engine.pattern_message());
        };

        // Acquire, lose for enough frames to drop back, reacquire
        run_frame(&mut engine, 1, true);
        for frame_id in 2..=8 {
            run_frame(&mut engine, frame_id, false);
        }
        run_frame(&mut engine, 9, true);

        assert_eq!(engine.current_phase(), TrackerPhase::TrackingModel);

        let mut codes = Vec::new();
        while let Ok(code) = status_rx.try_recv() {
            codes.push(code);
        }
        // Tracking -> detecting -> tracking is visible on the status channel
        assert!(codes.contains(&TrackerPhase::Detecting.code()));
        assert_eq!(codes.first(), Some(&TrackerPhase::TrackingModel.code()));
        assert_eq!(codes.last(), Some(&TrackerPhase::TrackingModel.code()));
    }

    /// A feed faster than the loop: iterations observe monotonically
    /// increasing frames and simply skip the ones that were overwritten.
    #[tokio::test]
    async fn test_fast_feed_slow_loop() {
        let feed = MockFrameFeed::new(MockFeedConfig {
            frequency_hz: 500.0,
            image_width: 64,
            image_height: 64,
            pattern: QrCodeDetector::encode("e2e payload"),
            camera: CameraIntrinsics::default(),
        });
        let source = FrameSource::new(Box::new(feed), Arc::new(FrameBuffer::new()));
        let buffer = source.buffer();
        source.start();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !buffer.is_ready() {
            assert!(Instant::now() < deadline, "feed never delivered a frame");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let mut seen = Vec::new();
        for _ in 0..8 {
            let snapshot = buffer.try_snapshot().unwrap();
            seen.push(snapshot.header.frame_id);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        source.stop();

        for pair in seen.windows(2) {
            assert!(pair[1] >= pair[0], "frame ids must be monotonic: {:?}", seen);
        }
        // At 500 Hz against a 50 Hz loop most frames are skipped
        assert!(
            seen.last().unwrap() - seen.first().unwrap() > 8,
            "expected skipped frames, saw {:?}",
            seen
        );
    }
}

#[cfg(test)]
mod pacing_tests {
    use std::time::{Duration, Instant};

    /// Sleep-out-the-remainder pacing holds the configured rate within
    /// tolerant bounds.
    #[tokio::test]
    async fn test_loop_pacing_holds_period() {
        let period = Duration::from_millis(20);
        let iterations = 10u32;

        let started = Instant::now();
        for _ in 0..iterations {
            let iter_start = Instant::now();
            // Iteration body is effectively instant here
            let elapsed = iter_start.elapsed();
            if elapsed < period {
                tokio::time::sleep(period - elapsed).await;
            }
        }
        let total = started.elapsed();

        let expected = period * iterations;
        assert!(
            total >= expected - Duration::from_millis(5),
            "loop ran too fast: {:?}",
            total
        );
        assert!(
            total < expected * 3,
            "loop ran far too slow: {:?}",
            total
        );
    }

    /// An overrunning iteration starts the next one immediately; the
    /// remainder sleep saturates at zero rather than going negative.
    #[tokio::test]
    async fn test_overrun_skips_sleep() {
        let period = Duration::from_millis(5);

        let iter_start = Instant::now();
        tokio::time::sleep(period * 2).await;
        let elapsed = iter_start.elapsed();

        let remainder = period.saturating_sub(elapsed);
        assert_eq!(remainder, Duration::ZERO);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    #[test]
    fn test_full_toml_round_trip_through_loader() {
        let toml = r#"
            [model]
            name = "pattern"
            path = "models"

            [tracker]
            variant = "edge_klt"
            reference_frame = "tracked_object"

            [detector]
            kind = "qr_code"

            [loop]
            frequency_hz = 30.0
            debug_display = false

            [channels]
            queue_capacity = 16
            log_taps = ["status", "pose"]

            [feed]
            frequency_hz = 60.0
            image_width = 640
            image_height = 480
            message = "integration payload"
        "#;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let blueprint = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(blueprint.model.name, "pattern");
        assert_eq!(blueprint.pacing.frequency_hz, 30.0);
        assert_eq!(blueprint.channels.log_taps.len(), 2);
        assert_eq!(blueprint.feed.message, "integration payload");
    }

    #[test]
    fn test_invalid_frequency_is_rejected() {
        let json = r#"{
            "model": { "name": "pattern", "path": "models" },
            "loop": { "frequency_hz": 0.0 }
        }"#;

        let err =
            config_loader::ConfigLoader::load_from_str(json, config_loader::ConfigFormat::Json)
                .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("frequency"), "unexpected error: {message}");
    }
}
