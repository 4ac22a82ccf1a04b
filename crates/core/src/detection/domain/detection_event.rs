use serde::Serialize;

use crate::detection::domain::face_record::FaceRecord;

/// Result of one analyzed frame, in caller-facing coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub faces: Vec<FaceRecord>,
    /// Frame width after rotation.
    pub width: u32,
    pub height: u32,
    /// Seconds since the recording session started, zero when not recording.
    pub recording_time: f64,
}
