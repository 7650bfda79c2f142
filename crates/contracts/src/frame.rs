//! FrameSnapshot - Capture output
//!
//! Immutable bundle of one synchronized (image, calibration) arrival.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Frame header: capture timestamp plus arrival sequence number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Capture timestamp (seconds, f64) - primary clock
    pub timestamp: f64,

    /// Arrival sequence number (monotonically increasing)
    pub frame_id: u64,
}

/// Pixel format of an image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Mono8,
    Rgb8,
    Rgba8,
    Bgra8,
}

/// Raw image payload
///
/// `data` is zero-copy shareable; the buffer is never mutated after capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBuffer {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Pixel format
    pub format: PixelFormat,

    /// Raw pixel data (zero-copy)
    pub data: Bytes,
}

impl ImageBuffer {
    /// Expected byte length for the declared dimensions and format.
    pub fn expected_len(&self) -> usize {
        let bpp = match self.format {
            PixelFormat::Mono8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        };
        (self.width as usize) * (self.height as usize) * bpp
    }
}

/// Pinhole camera intrinsic parameters
///
/// Delivered by the transport alongside every image; conversion from the
/// transport's native calibration record is the transport's concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length along u (pixels)
    pub fx: f64,

    /// Focal length along v (pixels)
    pub fy: f64,

    /// Principal point u coordinate (pixels)
    pub cx: f64,

    /// Principal point v coordinate (pixels)
    pub cy: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            fx: 600.0,
            fy: 600.0,
            cx: 320.0,
            cy: 240.0,
        }
    }
}

/// One fully-formed capture: image, calibration and header from the *same*
/// synchronized arrival. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Image payload
    pub image: ImageBuffer,

    /// Calibration that accompanied this image
    pub camera: CameraIntrinsics,

    /// Capture header
    pub header: FrameHeader,
}

impl FrameSnapshot {
    /// Build a snapshot from one delivery of the external feed.
    pub fn new(image: ImageBuffer, camera: CameraIntrinsics, header: FrameHeader) -> Self {
        Self {
            image,
            camera,
            header,
        }
    }
}
