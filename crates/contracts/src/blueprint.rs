//! TrackerBlueprint - Config Loader output
//!
//! Describes the complete run configuration: model resources, tracker and
//! detector variant selection, loop pacing, output channels, feed parameters.

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Model resources
    pub model: ModelConfig,

    /// Tracker settings
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Detector selection
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Loop pacing settings
    #[serde(default, rename = "loop")]
    pub pacing: LoopConfig,

    /// Output channel settings
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Synthetic feed settings (mock transport)
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Model resource configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (file stem of the description file)
    pub name: String,

    /// Directory holding model resources
    pub path: String,
}

impl ModelConfig {
    /// Full path of the model description file
    pub fn description_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.path).join(format!("{}.wrl", self.name))
    }
}

/// Tracker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Tracker implementation variant, chosen once at startup
    #[serde(default)]
    pub variant: TrackerVariant,

    /// Fixed reference-frame label stamped on every published payload
    #[serde(default = "default_reference_frame")]
    pub reference_frame: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            variant: TrackerVariant::default(),
            reference_frame: default_reference_frame(),
        }
    }
}

fn default_reference_frame() -> String {
    "tracked_object".to_string()
}

/// Closed set of tracker implementation variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerVariant {
    /// Moving-edge tracker
    Edge,
    /// Keypoint tracker
    Klt,
    /// Combined edge + keypoint tracker
    #[default]
    EdgeKlt,
}

/// Detector selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Detector implementation, chosen once at startup
    #[serde(default)]
    pub kind: DetectorKind,
}

/// Closed set of pattern detector implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// QR code detector
    #[default]
    QrCode,
    /// Data matrix detector
    DataMatrix,
}

/// Loop pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Target loop frequency (Hz), must be > 0
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,

    /// Enable the optional debug display
    #[serde(default)]
    pub debug_display: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            debug_display: false,
        }
    }
}

fn default_frequency_hz() -> f64 {
    30.0
}

impl LoopConfig {
    /// Target loop period derived from the configured frequency
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frequency_hz)
    }
}

/// Output channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Broadcast queue capacity per channel, must be > 0
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Channels that get a logging subscriber attached at startup
    #[serde(default)]
    pub log_taps: Vec<ChannelName>,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            log_taps: Vec::new(),
        }
    }
}

fn default_queue_capacity() -> usize {
    16
}

/// The six output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelName {
    Pose,
    PoseCovariance,
    Status,
    EdgeSites,
    Keypoints,
    PatternMessage,
}

impl ChannelName {
    /// Stable label used in logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelName::Pose => "pose",
            ChannelName::PoseCovariance => "pose_covariance",
            ChannelName::Status => "status",
            ChannelName::EdgeSites => "edge_sites",
            ChannelName::Keypoints => "keypoints",
            ChannelName::PatternMessage => "pattern_message",
        }
    }
}

/// Synthetic feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Delivery frequency (Hz), must be > 0
    #[serde(default = "default_feed_frequency")]
    pub frequency_hz: f64,

    /// Generated image width
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    /// Generated image height
    #[serde(default = "default_image_height")]
    pub image_height: u32,

    /// Pattern payload embedded in generated frames
    #[serde(default = "default_feed_message")]
    pub message: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_feed_frequency(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            message: default_feed_message(),
        }
    }
}

fn default_feed_frequency() -> f64 {
    60.0
}

fn default_image_width() -> u32 {
    640
}

fn default_image_height() -> u32 {
    480
}

fn default_feed_message() -> String {
    "pattern-tracker demo payload".to_string()
}
