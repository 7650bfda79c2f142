//! Stamped pose output types
//!
//! Every published payload carries the originating frame's header plus the
//! fixed reference-frame label of the tracker.

use serde::{Deserialize, Serialize};

use crate::FrameHeader;

/// 3D translation (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Unit quaternion rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Rigid pose of the tracked model in the camera frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Translation,
    pub rotation: Quaternion,
}

/// Header attached to every published payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StampedHeader {
    /// Header of the frame this result was computed from
    pub frame: FrameHeader,

    /// Fixed reference-frame identifier (configured once at startup)
    pub reference_frame: String,
}

impl StampedHeader {
    pub fn new(frame: FrameHeader, reference_frame: impl Into<String>) -> Self {
        Self {
            frame,
            reference_frame: reference_frame.into(),
        }
    }
}

/// Pose stamped with the originating frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: StampedHeader,
    pub pose: Pose,
}

/// Pose plus 6x6 covariance, row-major
///
/// Covariance computation is an external concern; this type only adds the
/// wrapping and stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseWithCovarianceStamped {
    pub header: StampedHeader,
    pub pose: Pose,
    #[serde(with = "covariance_matrix")]
    pub covariance: [f64; 36],
}

/// serde does not cover arrays past length 32, so the 6x6 matrix goes
/// through a sequence.
mod covariance_matrix {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[f64; 36], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(value.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f64; 36], D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"a covariance of 36 elements"))
    }
}

impl Default for PoseWithCovarianceStamped {
    fn default() -> Self {
        Self {
            header: StampedHeader::default(),
            pose: Pose::default(),
            covariance: [0.0; 36],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rotation_is_identity() {
        let q = Quaternion::default();
        assert_eq!(q.w, 1.0);
        assert_eq!((q.x, q.y, q.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn pose_cov_serde_round_trip() {
        let mut msg = PoseWithCovarianceStamped::default();
        msg.covariance[0] = 0.5;
        msg.header = StampedHeader::new(
            crate::FrameHeader {
                timestamp: 2.0,
                frame_id: 3,
            },
            "tracked_object",
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: PoseWithCovarianceStamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.covariance[0], 0.5);
        assert_eq!(back.header.reference_frame, "tracked_object");
    }
}
