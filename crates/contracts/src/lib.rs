//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the capture timestamp (seconds, f64) delivered by the transport as primary clock
//! - `frame_id` is monotonically increasing per arrival, used for ordering/diagnostics

mod blueprint;
mod diagnostics;
mod engine;
mod error;
mod feed;
mod frame;
mod pose;

pub use blueprint::*;
pub use diagnostics::*;
pub use engine::*;
pub use error::*;
pub use feed::{FrameCallback, FrameFeed};
pub use frame::*;
pub use pose::*;
