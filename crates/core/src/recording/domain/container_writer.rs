use std::path::Path;

use crate::orientation::domain::orientation_mapper::VideoRotation;
use crate::shared::error::BoxError;
use crate::shared::media_time::MediaTime;
use crate::shared::sample_buffer::{SampleBuffer, Track};

/// Track layout for a new recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriterSettings {
    pub width: u32,
    pub height: u32,
    /// Stored on the video track so players show it upright.
    pub rotation: VideoRotation,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Muxes one video and one audio track into a container file.
///
/// Buffers before the session start time are the caller's to discard;
/// the writer rebases appended timestamps onto the session start.
pub trait ContainerWriter: Send {
    /// Opens encoders and writes the container header.
    fn start_writing(&mut self) -> Result<(), BoxError>;

    fn start_session(&mut self, at: MediaTime) -> Result<(), BoxError>;

    /// `false` when the track input cannot take data right now.
    fn is_ready_for_more(&self, track: Track) -> bool;

    fn append(&mut self, buffer: &SampleBuffer) -> Result<(), BoxError>;

    /// No more data will arrive for `track`.
    fn mark_finished(&mut self, track: Track);

    /// Flushes encoders and writes the trailer.
    fn finish(self: Box<Self>) -> Result<(), BoxError>;
}

pub trait ContainerWriterFactory: Send + Sync {
    fn create(
        &self,
        path: &Path,
        settings: &WriterSettings,
    ) -> Result<Box<dyn ContainerWriter>, BoxError>;
}
