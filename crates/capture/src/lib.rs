//! # Capture
//!
//! Frame handoff between the transport's capture thread and the
//! orchestration loop.
//!
//! - [`FrameBuffer`]: latest-value buffer with copy-out reads; the only
//!   shared mutable state in the pipeline
//! - [`FrameSource`]: subscribes a [`contracts::FrameFeed`] and publishes
//!   every delivery into the buffer
//! - [`MockFrameFeed`] / [`ManualFrameFeed`]: synthetic feeds for tests and
//!   demo runs without a real transport

mod buffer;
mod mock;
mod source;

pub use buffer::FrameBuffer;
pub use mock::{ManualFeedHandle, ManualFrameFeed, MockFeedConfig, MockFrameFeed, PATTERN_OFFSET};
pub use source::FrameSource;
