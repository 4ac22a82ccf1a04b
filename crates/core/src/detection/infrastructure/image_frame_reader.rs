use std::path::Path;

use crate::detection::domain::detection_error::DetectionError;
use crate::shared::frame::VideoFrame;

/// Decodes a still image file into an RGB frame for one-shot recognition.
pub fn read_image_file(path: &Path) -> Result<VideoFrame, DetectionError> {
    let image = image::open(path)
        .map_err(|e| DetectionError::InvalidImage(format!("{}: {e}", path.display())))?;
    Ok(VideoFrame::from_rgb_image(image.to_rgb8(), 0))
}

/// Decodes an encoded image (PNG, JPEG, ...) held in memory.
pub fn read_image_bytes(bytes: &[u8]) -> Result<VideoFrame, DetectionError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| DetectionError::InvalidImage(e.to_string()))?;
    Ok(VideoFrame::from_rgb_image(image.to_rgb8(), 0))
}
