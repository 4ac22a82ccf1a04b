use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::sample_sink::SampleSink;
use crate::orientation::domain::device_orientation::CameraFacing;

/// A running camera plus microphone pair.
pub trait CaptureSource: Send {
    fn facing(&self) -> CameraFacing;

    /// Begins pushing sample buffers into `sink` from the device's own thread.
    fn start(&mut self, sink: SampleSink) -> Result<(), CaptureError>;

    /// Stops delivery. Safe to call repeatedly.
    fn stop(&mut self);

    /// Blocks until the device has delivered its last buffer. Live devices
    /// return only after `stop`.
    fn wait_until_finished(&mut self);
}

/// Resolves a camera facing to a physical capture device.
pub trait CameraProvider: Send + Sync {
    fn open_camera(&self, facing: CameraFacing) -> Result<Box<dyn CaptureSource>, CaptureError>;
}
