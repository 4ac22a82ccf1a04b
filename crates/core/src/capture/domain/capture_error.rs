use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to start capture: {0}")]
    StartFailed(String),

    #[error("capture queue has shut down")]
    SessionClosed,
}
