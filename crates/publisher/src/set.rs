//! PublisherSet - the six output channels and per-iteration dispatch

use contracts::{
    ChannelsConfig, EdgeSiteList, KeypointList, PoseStamped, PoseWithCovarianceStamped,
    StampedHeader, TrackerPhase, TrackingEngine,
};
use tracing::info;

use crate::channel::Channel;
use crate::metrics::ChannelMetricsSnapshot;

/// The full output surface of the tracker.
///
/// One dispatch per loop iteration walks all six channels. Status always
/// reflects the current phase; the pose channels carry payloads only in the
/// tracking phase; the diagnostics channels query the engine lazily so
/// feature extraction only happens for attached consumers.
pub struct PublisherSet {
    pose: Channel<PoseStamped>,
    pose_covariance: Channel<PoseWithCovarianceStamped>,
    status: Channel<i8>,
    edge_sites: Channel<EdgeSiteList>,
    keypoints: Channel<KeypointList>,
    pattern_message: Channel<String>,
}

impl PublisherSet {
    /// Create all six channels with the configured queue capacity.
    pub fn new(config: &ChannelsConfig) -> Self {
        info!(
            queue_capacity = config.queue_capacity,
            "publisher set created"
        );
        Self {
            pose: Channel::new("pose", config.queue_capacity),
            pose_covariance: Channel::new("pose_covariance", config.queue_capacity),
            status: Channel::new("status", config.queue_capacity),
            edge_sites: Channel::new("edge_sites", config.queue_capacity),
            keypoints: Channel::new("keypoints", config.queue_capacity),
            pattern_message: Channel::new("pattern_message", config.queue_capacity),
        }
    }

    /// Publish one iteration's outputs from the engine's current state.
    ///
    /// `message` is the last decoded pattern payload, if any frame has
    /// carried one.
    pub fn dispatch(&self, engine: &dyn TrackingEngine, header: &StampedHeader, message: Option<&str>) {
        let phase = engine.current_phase();

        self.status.publish_with(|| phase.code());

        if phase == TrackerPhase::TrackingModel {
            if let Ok(model) = engine.tracking_state() {
                self.pose.publish_with(|| PoseStamped {
                    header: header.clone(),
                    pose: model.pose,
                });
                self.pose_covariance.publish_with(|| PoseWithCovarianceStamped {
                    header: header.clone(),
                    pose: model.pose,
                    covariance: model.covariance,
                });
            }
        }

        self.edge_sites.publish_with(|| {
            let mut list = EdgeSiteList {
                header: header.clone(),
                sites: Vec::new(),
            };
            engine.fill_edge_sites(&mut list);
            list
        });

        self.keypoints.publish_with(|| {
            let mut list = KeypointList {
                header: header.clone(),
                points: Vec::new(),
            };
            engine.fill_keypoints(&mut list);
            list
        });

        if let Some(message) = message {
            self.pattern_message.publish_with(|| message.to_string());
        }
    }

    pub fn pose(&self) -> &Channel<PoseStamped> {
        &self.pose
    }

    pub fn pose_covariance(&self) -> &Channel<PoseWithCovarianceStamped> {
        &self.pose_covariance
    }

    pub fn status(&self) -> &Channel<i8> {
        &self.status
    }

    pub fn edge_sites(&self) -> &Channel<EdgeSiteList> {
        &self.edge_sites
    }

    pub fn keypoints(&self) -> &Channel<KeypointList> {
        &self.keypoints
    }

    pub fn pattern_message(&self) -> &Channel<String> {
        &self.pattern_message
    }

    /// Metrics snapshot for every channel (for the end-of-run report).
    pub fn metrics(&self) -> Vec<(&'static str, ChannelMetricsSnapshot)> {
        vec![
            (self.pose.name(), self.pose.metrics().snapshot()),
            (
                self.pose_covariance.name(),
                self.pose_covariance.metrics().snapshot(),
            ),
            (self.status.name(), self.status.metrics().snapshot()),
            (self.edge_sites.name(), self.edge_sites.metrics().snapshot()),
            (self.keypoints.name(), self.keypoints.metrics().snapshot()),
            (
                self.pattern_message.name(),
                self.pattern_message.metrics().snapshot(),
            ),
        ]
    }
}
