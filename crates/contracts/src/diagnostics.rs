//! Per-feature diagnostic payloads
//!
//! Populated by the tracking engine on request, only when a diagnostics
//! channel has at least one consumer.

use serde::{Deserialize, Serialize};

use crate::StampedHeader;

/// One tracked moving-edge site
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSite {
    /// Pixel x coordinate
    pub x: f64,

    /// Pixel y coordinate
    pub y: f64,

    /// Suppression state (0 = active, non-zero = rejected by the tracker)
    pub suppress: i32,
}

/// Edge-diagnostics payload: all edge sites of the current model state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSiteList {
    pub header: StampedHeader,
    pub sites: Vec<EdgeSite>,
}

/// One tracked keypoint feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Feature identifier, stable across iterations while tracked
    pub id: i32,

    /// Pixel x coordinate
    pub x: f64,

    /// Pixel y coordinate
    pub y: f64,
}

/// Keypoint-diagnostics payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypointList {
    pub header: StampedHeader,
    pub points: Vec<Keypoint>,
}
