//! Mock frame feeds
//!
//! Implement `FrameFeed` without a real transport. `MockFrameFeed` generates
//! synthetic frames at a fixed rate on a background thread, mirroring how a
//! real capture callback arrives; `ManualFrameFeed` lets tests deliver frames
//! at exactly chosen moments.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{CameraIntrinsics, FrameCallback, FrameFeed, FrameHeader, ImageBuffer, PixelFormat};
use tracing::{debug, trace};

/// Byte offset at which the pattern payload is embedded in generated images.
///
/// Detectors scan the whole buffer; the fixed offset just keeps generated
/// frames deterministic.
pub const PATTERN_OFFSET: usize = 64;

/// Mock feed configuration
#[derive(Debug, Clone)]
pub struct MockFeedConfig {
    /// Delivery frequency (Hz)
    pub frequency_hz: f64,
    /// Generated image width
    pub image_width: u32,
    /// Generated image height
    pub image_height: u32,
    /// Encoded pattern payload embedded in every frame (may be empty)
    pub pattern: Bytes,
    /// Intrinsics reported with every frame
    pub camera: CameraIntrinsics,
}

impl Default for MockFeedConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 60.0,
            image_width: 640,
            image_height: 480,
            pattern: Bytes::new(),
            camera: CameraIntrinsics::default(),
        }
    }
}

/// Synthetic frame feed
///
/// Generates flat gray frames with the configured pattern bytes embedded,
/// delivered through the callback on a background thread, consistent with
/// real transport behavior.
pub struct MockFrameFeed {
    config: MockFeedConfig,
    active: Arc<AtomicBool>,
}

impl MockFrameFeed {
    /// Create a new mock feed
    pub fn new(config: MockFeedConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    fn generate_image(config: &MockFeedConfig) -> ImageBuffer {
        let size = config.image_width as usize * config.image_height as usize;
        let mut data = vec![128u8; size];
        let pattern = config.pattern.as_ref();
        if !pattern.is_empty() && PATTERN_OFFSET + pattern.len() <= size {
            data[PATTERN_OFFSET..PATTERN_OFFSET + pattern.len()].copy_from_slice(pattern);
        }
        ImageBuffer {
            width: config.image_width,
            height: config.image_height,
            format: PixelFormat::Mono8,
            data: Bytes::from(data),
        }
    }
}

impl FrameFeed for MockFrameFeed {
    fn subscribe(&self, callback: FrameCallback) {
        // Idempotent: if already delivering, don't start again
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let active = self.active.clone();
        let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);

        thread::spawn(move || {
            let mut frame_id: u64 = 0;
            let start_time = std::time::Instant::now();

            debug!(
                frequency_hz = config.frequency_hz,
                width = config.image_width,
                height = config.image_height,
                "mock frame feed started"
            );

            while active.load(Ordering::Relaxed) {
                frame_id += 1;
                let header = FrameHeader {
                    timestamp: start_time.elapsed().as_secs_f64(),
                    frame_id,
                };
                let image = Self::generate_image(&config);

                callback(image, config.camera, header);

                trace!(frame_id, "mock frame delivered");
                thread::sleep(interval);
            }

            debug!("mock frame feed stopped");
        });
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// Test feed whose frames are pushed explicitly by the caller.
#[derive(Default)]
pub struct ManualFrameFeed {
    inner: Arc<ManualFeedInner>,
}

#[derive(Default)]
struct ManualFeedInner {
    callback: Mutex<Option<FrameCallback>>,
    active: AtomicBool,
    delivered: AtomicU64,
}

impl ManualFrameFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for pushing frames after the feed itself is boxed away.
    pub fn handle(&self) -> ManualFeedHandle {
        ManualFeedHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl FrameFeed for ManualFrameFeed {
    fn subscribe(&self, callback: FrameCallback) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut slot = match self.inner.callback.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(callback);
    }

    fn stop(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Relaxed)
    }
}

/// Push side of a [`ManualFrameFeed`].
#[derive(Clone)]
pub struct ManualFeedHandle {
    inner: Arc<ManualFeedInner>,
}

impl ManualFeedHandle {
    /// Deliver one frame through the registered callback.
    ///
    /// Silently dropped when the feed is stopped or nothing subscribed yet,
    /// matching real transport semantics.
    pub fn push(&self, image: ImageBuffer, camera: CameraIntrinsics, header: FrameHeader) {
        if !self.inner.active.load(Ordering::Relaxed) {
            return;
        }
        let callback = {
            let slot = match self.inner.callback.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.clone()
        };
        if let Some(callback) = callback {
            callback(image, camera, header);
            self.inner.delivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of frames actually delivered.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }
}
