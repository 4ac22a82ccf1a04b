use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::software::{resampling, scaling};
use ffmpeg_next::util::frame::{audio::Audio as AudioFrame, video::Video as RawVideoFrame};
use ffmpeg_next::{ChannelLayout, Rational};

use crate::capture::domain::camera_provider::{CameraProvider, CaptureSource};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::sample_sink::SampleSink;
use crate::orientation::domain::device_orientation::CameraFacing;
use crate::shared::audio_chunk::AudioChunk;
use crate::shared::constants::AUDIO_SAMPLE_RATE;
use crate::shared::error::BoxError;
use crate::shared::frame::VideoFrame;
use crate::shared::media_time::MediaTime;
use crate::shared::sample_buffer::SampleBuffer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Sleep between buffers so delivery follows the media clock.
    pub realtime: bool,
    /// Stop after this much media time.
    pub max_duration: Option<Duration>,
    /// Microphone output rate.
    pub sample_rate: u32,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            realtime: false,
            max_duration: None,
            sample_rate: AUDIO_SAMPLE_RATE,
        }
    }
}

/// Serves each camera facing from a media file, so the pipeline can run
/// against recorded footage exactly as it would against a live device.
#[derive(Default)]
pub struct FileReplayCameraProvider {
    files: HashMap<CameraFacing, PathBuf>,
    options: ReplayOptions,
}

impl FileReplayCameraProvider {
    pub fn new(options: ReplayOptions) -> Self {
        Self {
            files: HashMap::new(),
            options,
        }
    }

    pub fn with_camera(mut self, facing: CameraFacing, path: impl Into<PathBuf>) -> Self {
        self.files.insert(facing, path.into());
        self
    }
}

impl CameraProvider for FileReplayCameraProvider {
    fn open_camera(&self, facing: CameraFacing) -> Result<Box<dyn CaptureSource>, CaptureError> {
        let path = self
            .files
            .get(&facing)
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no {facing} camera")))?;
        check_media(path)?;
        Ok(Box::new(FileReplaySource::new(facing, path, self.options)))
    }
}

/// Checks the file can act as both camera and microphone.
fn check_media(path: &Path) -> Result<(), CaptureError> {
    let unavailable = |reason: String| CaptureError::DeviceUnavailable(reason);
    ffmpeg_next::init().map_err(|e| unavailable(e.to_string()))?;
    let ictx = ffmpeg_next::format::input(path)
        .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
    if ictx.streams().best(ffmpeg_next::media::Type::Video).is_none() {
        return Err(unavailable(format!("no video stream in {}", path.display())));
    }
    if ictx.streams().best(ffmpeg_next::media::Type::Audio).is_none() {
        return Err(unavailable(format!("no microphone: {} has no audio stream", path.display())));
    }
    Ok(())
}

pub struct FileReplaySource {
    facing: CameraFacing,
    path: PathBuf,
    options: ReplayOptions,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FileReplaySource {
    pub fn new(facing: CameraFacing, path: &Path, options: ReplayOptions) -> Self {
        Self {
            facing,
            path: path.to_path_buf(),
            options,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("{} camera thread panicked", self.facing);
            }
        }
    }
}

impl CaptureSource for FileReplaySource {
    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn start(&mut self, sink: SampleSink) -> Result<(), CaptureError> {
        if self.thread.is_some() {
            return Err(CaptureError::StartFailed(format!(
                "{} camera already running",
                self.facing
            )));
        }
        self.stop.store(false, Ordering::Release);

        let path = self.path.clone();
        let options = self.options;
        let stop = Arc::clone(&self.stop);
        let facing = self.facing;
        let handle = std::thread::Builder::new()
            .name(format!("camera-{facing}"))
            .spawn(move || match replay(&path, &options, &sink, &stop) {
                Ok(stats) => log::debug!(
                    "{facing} camera finished: {} video, {} audio buffers",
                    stats.video,
                    stats.audio
                ),
                Err(e) => log::error!("{facing} camera failed: {e}"),
            })
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;
        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.join();
    }

    fn wait_until_finished(&mut self) {
        self.join();
    }
}

impl Drop for FileReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Default)]
struct ReplayStats {
    video: usize,
    audio: usize,
}

/// Paces delivery and enforces the duration limit on the media clock.
struct Clock {
    realtime: bool,
    max_duration: Option<f64>,
    origin: Option<(MediaTime, Instant)>,
}

impl Clock {
    /// Returns `false` once `pts` is past the duration limit.
    fn admit(&mut self, pts: MediaTime) -> bool {
        let (first, started) = *self.origin.get_or_insert((pts, Instant::now()));
        let offset = pts.seconds_since(first).max(0.0);
        if self.max_duration.is_some_and(|max| offset >= max) {
            return false;
        }
        if self.realtime {
            let due = started + Duration::from_secs_f64(offset);
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        true
    }
}

fn media_time(pts: i64, time_base: Rational) -> MediaTime {
    MediaTime::new(pts * time_base.numerator() as i64, time_base.denominator())
}

struct VideoDecoder {
    decoder: ffmpeg_next::decoder::Video,
    stream_index: usize,
    time_base: Rational,
    scaler: Option<scaling::Context>,
    frame_index: usize,
}

impl VideoDecoder {
    fn receive(&mut self) -> Result<Option<SampleBuffer>, BoxError> {
        let mut decoded = RawVideoFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let (width, height) = (decoded.width(), decoded.height());
        if self.scaler.is_none() {
            self.scaler = Some(scaling::Context::get(
                decoded.format(),
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("scaler missing")?;
        let mut rgb = RawVideoFrame::empty();
        scaler.run(&decoded, &mut rgb)?;

        let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
        let frame = VideoFrame::new(extract_rgb_pixels(&rgb, width, height), width, height, self.frame_index);
        self.frame_index += 1;
        Ok(Some(SampleBuffer::video(frame, media_time(pts, self.time_base))))
    }
}

struct AudioDecoder {
    decoder: ffmpeg_next::decoder::Audio,
    stream_index: usize,
    time_base: Rational,
    resampler: resampling::Context,
    sample_rate: u32,
    next_time: Option<MediaTime>,
}

impl AudioDecoder {
    fn receive(&mut self) -> Result<Option<SampleBuffer>, BoxError> {
        let mut decoded = AudioFrame::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut resampled = AudioFrame::empty();
        self.resampler.run(&decoded, &mut resampled)?;

        let at = match decoded.timestamp().or(decoded.pts()) {
            Some(pts) => media_time(pts, self.time_base),
            None => self.next_time.unwrap_or_else(MediaTime::zero),
        };
        Ok(Some(self.chunk(&resampled, at)))
    }

    fn flush(&mut self) -> Result<Option<SampleBuffer>, BoxError> {
        let mut resampled = AudioFrame::empty();
        match self.resampler.flush(&mut resampled)? {
            Some(_) if resampled.samples() > 0 => {
                let at = self.next_time.unwrap_or_else(MediaTime::zero);
                Ok(Some(self.chunk(&resampled, at)))
            }
            _ => Ok(None),
        }
    }

    fn chunk(&mut self, resampled: &AudioFrame, at: MediaTime) -> SampleBuffer {
        let samples = extract_f32_samples(resampled);
        let rate = self.sample_rate as i32;
        self.next_time = Some(MediaTime::new(at.rescale(rate) + samples.len() as i64, rate));
        SampleBuffer::audio(AudioChunk::new(samples, self.sample_rate, 1), at)
    }
}

fn open_decoders(
    ictx: &ffmpeg_next::format::context::Input,
    sample_rate: u32,
) -> Result<(VideoDecoder, AudioDecoder), BoxError> {
    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("no video stream")?;
    let video = VideoDecoder {
        decoder: ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())?
            .decoder()
            .video()?,
        stream_index: video_stream.index(),
        time_base: video_stream.time_base(),
        scaler: None,
        frame_index: 0,
    };

    let audio_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .ok_or("no audio stream")?;
    let decoder = ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())?
        .decoder()
        .audio()?;
    let resampler = resampling::Context::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        Sample::F32(SampleType::Planar),
        ChannelLayout::MONO,
        sample_rate,
    )?;
    let audio = AudioDecoder {
        decoder,
        stream_index: audio_stream.index(),
        time_base: audio_stream.time_base(),
        resampler,
        sample_rate,
        next_time: None,
    };
    Ok((video, audio))
}

/// Decodes `path` in packet order and pushes every buffer into `sink`.
fn replay(
    path: &Path,
    options: &ReplayOptions,
    sink: &SampleSink,
    stop: &AtomicBool,
) -> Result<ReplayStats, BoxError> {
    ffmpeg_next::init()?;
    let mut ictx = ffmpeg_next::format::input(path)?;
    let (mut video, mut audio) = open_decoders(&ictx, options.sample_rate)?;

    let mut clock = Clock {
        realtime: options.realtime,
        max_duration: options.max_duration.map(|d| d.as_secs_f64()),
        origin: None,
    };
    let mut stats = ReplayStats::default();
    let mut deliver = |buffer: SampleBuffer, stats: &mut ReplayStats| -> bool {
        if stop.load(Ordering::Acquire) || !clock.admit(buffer.presentation_time()) {
            return false;
        }
        let is_video = buffer.video_frame().is_some();
        if !sink.push(buffer) {
            return false;
        }
        if is_video {
            stats.video += 1;
        } else {
            stats.audio += 1;
        }
        true
    };

    for (stream, packet) in ictx.packets() {
        let index = stream.index();
        if index == video.stream_index {
            if video.decoder.send_packet(&packet).is_err() {
                continue;
            }
            while let Some(buffer) = video.receive()? {
                if !deliver(buffer, &mut stats) {
                    return Ok(stats);
                }
            }
        } else if index == audio.stream_index {
            if audio.decoder.send_packet(&packet).is_err() {
                continue;
            }
            while let Some(buffer) = audio.receive()? {
                if !deliver(buffer, &mut stats) {
                    return Ok(stats);
                }
            }
        }
    }

    let _ = video.decoder.send_eof();
    while let Some(buffer) = video.receive()? {
        if !deliver(buffer, &mut stats) {
            return Ok(stats);
        }
    }
    let _ = audio.decoder.send_eof();
    while let Some(buffer) = audio.receive()? {
        if !deliver(buffer, &mut stats) {
            return Ok(stats);
        }
    }
    if let Some(buffer) = audio.flush()? {
        deliver(buffer, &mut stats);
    }
    Ok(stats)
}

/// Copies RGB rows out of an ffmpeg frame, dropping stride padding.
fn extract_rgb_pixels(rgb: &RawVideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * VideoFrame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

fn extract_f32_samples(frame: &AudioFrame) -> Vec<f32> {
    let count = frame.samples();
    frame.data(0)[..count * 4]
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
