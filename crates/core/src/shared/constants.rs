use std::time::Duration;

/// Media time skipped after the first captured video frame before the writer
/// session begins, so the encoder's fade-in never reaches the file.
pub const RECORDING_START_DELAY: Duration = Duration::from_millis(300);

pub const VIDEO_WIDTH: u32 = 1280;
pub const VIDEO_HEIGHT: u32 = 720;

/// Encoder time base for the video track (1/1000 s).
pub const VIDEO_TIMESCALE: i32 = 1000;

pub const AUDIO_SAMPLE_RATE: u32 = 16000;
pub const AUDIO_CHANNELS: u16 = 1;

pub const OUTPUT_EXTENSION: &str = "mov";

/// Buffers the device may queue ahead of the capture thread.
pub const CAPTURE_QUEUE_CAPACITY: usize = 64;

pub const SETTINGS_DIR_NAME: &str = "FaceCam";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
