//! FrameFeed trait - synchronized frame source abstraction
//!
//! Defines a unified interface for push-based frame delivery, decoupling the
//! capture side from the concrete transport. The transport guarantees that
//! image and calibration in one delivery are already time-correlated.

use std::sync::Arc;

use crate::{CameraIntrinsics, FrameHeader, ImageBuffer};

/// Frame delivery callback type
///
/// Invoked on the feed's capture thread once per synchronized arrival.
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type FrameCallback = Arc<dyn Fn(ImageBuffer, CameraIntrinsics, FrameHeader) + Send + Sync>;

/// Push-based synchronized frame source
///
/// Abstracts the transport delivering (image, calibration) pairs. Mock feeds
/// and real transports implement the same interface.
///
/// # Design Principles
///
/// 1. **Decoupling**: separates frame delivery from frame consumption
/// 2. **Correlation is external**: one callback invocation = one already
///    synchronized arrival; this crate never pairs heterogeneous streams
/// 3. **Callback pattern**: the callback must return quickly; implementors
///    must not be blocked longer than the consumer's buffer write takes
pub trait FrameFeed: Send + Sync {
    /// Register the delivery callback
    ///
    /// If already subscribed, repeated calls are idempotent (won't register
    /// multiple callbacks).
    fn subscribe(&self, callback: FrameCallback);

    /// Stop delivering frames
    fn stop(&self);

    /// Check if currently delivering
    fn is_active(&self) -> bool;
}
