use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("failed to open recording writer: {0}")]
    WriterInitFailed(String),

    #[error("failed to finalize recording: {0}")]
    WriterFinalizeFailed(String),

    #[error("failed to write recording: {0}")]
    WriteFailed(String),
}
