use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;
use crate::detection::domain::detection_error::DetectionError;
use crate::recording::domain::recording_error::RecordingError;
use crate::shared::settings::SettingsError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
