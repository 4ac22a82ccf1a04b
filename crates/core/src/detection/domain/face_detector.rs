use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::face_record::FaceRecord;
use crate::orientation::domain::orientation_mapper::ImageOrientation;
use crate::shared::error::BoxError;
use crate::shared::frame::VideoFrame;

/// Domain interface for the external face detection capability.
///
/// Implementations may be stateful (e.g., tracking across frames),
/// hence `&mut self`. Coordinates are returned in the raw sensor frame;
/// remapping for the caller happens in the pipeline.
pub trait FaceDetector: Send {
    /// Rebuilds the detector for a new option snapshot.
    fn configure(&mut self, config: &DetectionConfig) -> Result<(), BoxError>;

    /// Runs detection on one frame. `Ok(None)` means the detector produced
    /// no result at all, as opposed to an empty face list.
    fn detect(
        &mut self,
        frame: &VideoFrame,
        orientation: ImageOrientation,
    ) -> Result<Option<Vec<FaceRecord>>, BoxError>;
}
