//! # Publisher
//!
//! Fan-out of tracking results over broadcast channels.
//!
//! Each of the six output channels is an independent [`Channel`] with its own
//! bounded queue. Publishing is gated on live consumers and payloads are
//! built lazily, so an unconsumed channel costs neither serialization nor
//! feature extraction work. [`PublisherSet`] groups the six channels and
//! performs one per-iteration dispatch from the engine's current state.

mod channel;
mod metrics;
mod set;

pub use channel::Channel;
pub use metrics::{ChannelMetrics, ChannelMetricsSnapshot};
pub use set::PublisherSet;
