use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::orientation::domain::orientation_mapper::ImageOrientation;
use crate::shared::error::BoxError;
use crate::shared::frame::VideoFrame;

/// Replays pre-computed face records by frame index.
///
/// The source JSON maps frame indices to face lists:
/// `{"0": [{"trackingId": 1, "landmarks": {"NOSE_BASE": {"x": 1, "y": 2}}}]}`.
/// Attributes the active configuration disables are stripped, and faces
/// narrower than `minFaceSize` of the frame width are dropped, so replayed
/// output looks like what a live detector with the same options returns.
pub struct ReplayFaceDetector {
    faces: Arc<HashMap<usize, Vec<FaceRecord>>>,
    config: DetectionConfig,
}

impl ReplayFaceDetector {
    pub fn new(faces: Arc<HashMap<usize, Vec<FaceRecord>>>) -> Self {
        Self {
            faces,
            config: DetectionConfig::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, BoxError> {
        let faces: HashMap<usize, Vec<FaceRecord>> = serde_json::from_str(json)?;
        Ok(Self::new(Arc::new(faces)))
    }

    pub fn from_file(path: &Path) -> Result<Self, BoxError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read detections {}: {e}", path.display()))?;
        Self::from_json(&json)
    }

    fn restrict(&self, mut face: FaceRecord) -> FaceRecord {
        if !self.config.landmark_mode.is_enabled() {
            face.landmarks.clear();
        }
        if !self.config.contour_mode.is_enabled() {
            face.contours.clear();
        }
        if !self.config.classification_mode.is_enabled() {
            face.smiling_probability = None;
            face.left_eye_open_probability = None;
            face.right_eye_open_probability = None;
        }
        if !self.config.tracking_enabled {
            face.tracking_id = None;
        }
        face
    }

    fn is_large_enough(&self, face: &FaceRecord, frame_width: u32) -> bool {
        match face.extent() {
            Some(extent) if frame_width > 0 && extent.width() > 0.0 => {
                extent.width() / frame_width as f32 >= self.config.min_face_size
            }
            _ => true,
        }
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn configure(&mut self, config: &DetectionConfig) -> Result<(), BoxError> {
        self.config = *config;
        Ok(())
    }

    fn detect(
        &mut self,
        frame: &VideoFrame,
        _orientation: ImageOrientation,
    ) -> Result<Option<Vec<FaceRecord>>, BoxError> {
        let faces = self
            .faces
            .get(&frame.index())
            .map(|faces| {
                faces
                    .iter()
                    .filter(|face| self.is_large_enough(face, frame.width()))
                    .cloned()
                    .map(|face| self.restrict(face))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(faces))
    }
}
