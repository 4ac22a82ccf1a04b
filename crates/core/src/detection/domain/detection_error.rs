use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("face detector is not configured")]
    NotConfigured,

    #[error("face recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("failed to configure face detector: {0}")]
    ConfigureFailed(String),

    #[error("could not decode image: {0}")]
    InvalidImage(String),

    #[error("detection worker has stopped")]
    WorkerStopped,
}
