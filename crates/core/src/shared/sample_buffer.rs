use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::shared::audio_chunk::AudioChunk;
use crate::shared::frame::VideoFrame;
use crate::shared::media_time::MediaTime;

/// One of the two media streams multiplexed into a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Audio,
    Video,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Audio => write!(f, "audio"),
            Track::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug)]
enum Payload {
    Video(Arc<VideoFrame>),
    Audio(AudioChunk),
}

/// A timestamped unit of captured media.
///
/// Buffers are moved, never cloned: whichever stage is processing one owns
/// it. The video payload is reference counted so the detection worker can
/// read the pixels without copying them.
#[derive(Debug)]
pub struct SampleBuffer {
    presentation_time: MediaTime,
    payload: Payload,
}

impl SampleBuffer {
    pub fn video(frame: VideoFrame, presentation_time: MediaTime) -> Self {
        Self {
            presentation_time,
            payload: Payload::Video(Arc::new(frame)),
        }
    }

    pub fn audio(chunk: AudioChunk, presentation_time: MediaTime) -> Self {
        Self {
            presentation_time,
            payload: Payload::Audio(chunk),
        }
    }

    pub fn track(&self) -> Track {
        match self.payload {
            Payload::Video(_) => Track::Video,
            Payload::Audio(_) => Track::Audio,
        }
    }

    pub fn presentation_time(&self) -> MediaTime {
        self.presentation_time
    }

    pub fn video_frame(&self) -> Option<&Arc<VideoFrame>> {
        match &self.payload {
            Payload::Video(frame) => Some(frame),
            Payload::Audio(_) => None,
        }
    }

    pub fn audio_chunk(&self) -> Option<&AudioChunk> {
        match &self.payload {
            Payload::Audio(chunk) => Some(chunk),
            Payload::Video(_) => None,
        }
    }
}
