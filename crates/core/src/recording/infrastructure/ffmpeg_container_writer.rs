use std::path::{Path, PathBuf};

use ffmpeg_next::codec::encoder::{audio, video, Encoder};
use ffmpeg_next::ffi;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::stream::StreamMut;
use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::software::scaling;
use ffmpeg_next::{ChannelLayout, Dictionary, Rational};

use crate::orientation::domain::orientation_mapper::VideoRotation;
use crate::recording::domain::container_writer::{
    ContainerWriter, ContainerWriterFactory, WriterSettings,
};
use crate::shared::audio_chunk::AudioChunk;
use crate::shared::constants::VIDEO_TIMESCALE;
use crate::shared::error::BoxError;
use crate::shared::frame::VideoFrame;
use crate::shared::media_time::MediaTime;
use crate::shared::sample_buffer::{SampleBuffer, Track};

const FALLBACK_AUDIO_FRAME_SIZE: usize = 1024;
const NOMINAL_FRAME_RATE: i32 = 30;

pub struct FfmpegContainerWriterFactory;

impl ContainerWriterFactory for FfmpegContainerWriterFactory {
    fn create(
        &self,
        path: &Path,
        settings: &WriterSettings,
    ) -> Result<Box<dyn ContainerWriter>, BoxError> {
        Ok(Box::new(FfmpegContainerWriter::new(path, *settings)))
    }
}

struct VideoTrack {
    encoder: video::Encoder,
    stream_index: usize,
    scaler: Option<(scaling::Context, u32, u32)>,
    last_pts: Option<i64>,
    finished: bool,
}

struct AudioTrack {
    encoder: audio::Encoder,
    stream_index: usize,
    sample_rate: u32,
    frame_size: usize,
    pending: Vec<f32>,
    next_pts: Option<i64>,
    finished: bool,
}

/// Writes a QuickTime container with an H.264 (or MPEG-4) video track and
/// a mono AAC audio track.
///
/// Timestamps are rebased so the session start lands at zero. The video
/// rotation is stored as display-matrix side data, which the mov muxer
/// writes into the track header, plus the legacy `rotate` tag.
pub struct FfmpegContainerWriter {
    path: PathBuf,
    settings: WriterSettings,
    octx: Option<Output>,
    video: Option<VideoTrack>,
    audio: Option<AudioTrack>,
    session_start: Option<MediaTime>,
}

// Safety: the writer is owned by one thread at a time (capture queue, then
// the finalize thread). The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegContainerWriter {}

impl FfmpegContainerWriter {
    pub fn new(path: &Path, settings: WriterSettings) -> Self {
        Self {
            path: path.to_path_buf(),
            settings,
            octx: None,
            video: None,
            audio: None,
            session_start: None,
        }
    }

    fn open_video(&self, octx: &mut Output, global_header: bool) -> Result<VideoTrack, BoxError> {
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::H264)
            .or_else(|| ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4))
            .ok_or("no H.264 or MPEG-4 encoder available")?;

        let mut ost = octx.add_stream(Some(codec))?;
        let stream_index = ost.index();

        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        ctx.set_width(self.settings.width);
        ctx.set_height(self.settings.height);
        ctx.set_format(Pixel::YUV420P);
        ctx.set_time_base(Rational(1, VIDEO_TIMESCALE));
        ctx.set_frame_rate(Some(Rational(NOMINAL_FRAME_RATE, 1)));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_with(Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(Rational(1, VIDEO_TIMESCALE));

        let mut metadata = Dictionary::new();
        metadata.set(
            "rotate",
            &self.settings.rotation.normalized_degrees().to_string(),
        );
        ost.set_metadata(metadata);
        attach_display_matrix(&mut ost, self.settings.rotation)?;

        Ok(VideoTrack {
            encoder,
            stream_index,
            scaler: None,
            last_pts: None,
            finished: false,
        })
    }

    fn open_audio(&self, octx: &mut Output, global_header: bool) -> Result<AudioTrack, BoxError> {
        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::AAC)
            .ok_or("AAC encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;
        let stream_index = ost.index();

        let sample_rate = self.settings.sample_rate;
        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()?;
        ctx.set_rate(sample_rate as i32);
        ctx.set_channel_layout(ChannelLayout::MONO);
        ctx.set_format(Sample::F32(SampleType::Planar));
        ctx.set_time_base(Rational(1, sample_rate as i32));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = ctx.open_as(codec)?;
        ost.set_parameters(&encoder);
        ost.set_time_base(Rational(1, sample_rate as i32));

        let frame_size = match encoder.frame_size() as usize {
            0 => FALLBACK_AUDIO_FRAME_SIZE,
            n => n,
        };

        Ok(AudioTrack {
            encoder,
            stream_index,
            sample_rate,
            frame_size,
            pending: Vec::new(),
            next_pts: None,
            finished: false,
        })
    }
}

impl ContainerWriter for FfmpegContainerWriter {
    fn start_writing(&mut self) -> Result<(), BoxError> {
        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output_as(&self.path, "mov")?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let video = self.open_video(&mut octx, global_header)?;
        let audio = self.open_audio(&mut octx, global_header)?;

        octx.write_header()?;
        log::debug!(
            "recording writer opened {} ({}x{}, rotate {}°, {} Hz)",
            self.path.display(),
            self.settings.width,
            self.settings.height,
            self.settings.rotation.normalized_degrees(),
            self.settings.sample_rate
        );

        self.octx = Some(octx);
        self.video = Some(video);
        self.audio = Some(audio);
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) -> Result<(), BoxError> {
        if self.octx.is_none() {
            return Err("writer not started".into());
        }
        self.session_start = Some(at);
        Ok(())
    }

    fn is_ready_for_more(&self, track: Track) -> bool {
        match track {
            Track::Video => self.video.as_ref().is_some_and(|t| !t.finished),
            Track::Audio => self.audio.as_ref().is_some_and(|t| !t.finished),
        }
    }

    fn append(&mut self, buffer: &SampleBuffer) -> Result<(), BoxError> {
        let start = self.session_start.ok_or("session not started")?;
        let octx = self.octx.as_mut().ok_or("writer not started")?;

        if let Some(frame) = buffer.video_frame() {
            let track = self.video.as_mut().ok_or("video track missing")?;
            let pts = buffer.presentation_time().rescale(VIDEO_TIMESCALE)
                - start.rescale(VIDEO_TIMESCALE);
            if pts < 0 || track.finished {
                return Ok(());
            }
            encode_video(track, frame, pts, &self.settings, octx)
        } else if let Some(chunk) = buffer.audio_chunk() {
            let track = self.audio.as_mut().ok_or("audio track missing")?;
            if track.finished {
                return Ok(());
            }
            let rate = track.sample_rate as i32;
            let offset = buffer.presentation_time().rescale(rate) - start.rescale(rate);
            encode_audio(track, chunk, offset, octx)
        } else {
            Ok(())
        }
    }

    fn mark_finished(&mut self, track: Track) {
        match track {
            Track::Video => {
                if let Some(t) = self.video.as_mut() {
                    t.finished = true;
                }
            }
            Track::Audio => {
                if let Some(t) = self.audio.as_mut() {
                    t.finished = true;
                }
            }
        }
    }

    fn finish(mut self: Box<Self>) -> Result<(), BoxError> {
        let mut octx = self.octx.take().ok_or("writer was never started")?;

        if let Some(mut track) = self.audio.take() {
            flush_audio(&mut track, &mut octx)?;
            track.encoder.send_eof()?;
            drain_packets(&mut track.encoder, track.stream_index, &mut octx)?;
        }
        if let Some(mut track) = self.video.take() {
            track.encoder.send_eof()?;
            drain_packets(&mut track.encoder, track.stream_index, &mut octx)?;
        }

        octx.write_trailer()?;
        log::debug!("recording writer finalized {}", self.path.display());
        Ok(())
    }
}

/// Must run after `set_parameters`, which resets the stream's side data.
fn attach_display_matrix(ost: &mut StreamMut<'_>, rotation: VideoRotation) -> Result<(), BoxError> {
    let matrix = rotation.display_matrix();
    let size = std::mem::size_of_val(&matrix);
    // Safety: codecpar is owned by the stream, which outlives this call;
    // the new entry is allocated with exactly `size` bytes.
    unsafe {
        let par = (*ost.as_mut_ptr()).codecpar;
        let side_data = ffi::av_packet_side_data_new(
            &mut (*par).coded_side_data,
            &mut (*par).nb_coded_side_data,
            ffi::AVPacketSideDataType::AV_PKT_DATA_DISPLAYMATRIX,
            size,
            0,
        );
        if side_data.is_null() {
            return Err("could not allocate display matrix".into());
        }
        std::ptr::copy_nonoverlapping(matrix.as_ptr().cast::<u8>(), (*side_data).data, size);
    }
    Ok(())
}

fn encode_video(
    track: &mut VideoTrack,
    frame: &VideoFrame,
    pts: i64,
    settings: &WriterSettings,
    octx: &mut Output,
) -> Result<(), BoxError> {
    let (width, height) = (frame.width(), frame.height());
    let needs_scaler = !matches!(track.scaler, Some((_, w, h)) if w == width && h == height);
    if needs_scaler {
        let scaler = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            settings.width,
            settings.height,
            scaling::Flags::BILINEAR,
        )?;
        track.scaler = Some((scaler, width, height));
    }
    let (scaler, _, _) = track.scaler.as_mut().ok_or("scaler missing")?;

    let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(Pixel::RGB24, width, height);
    let stride = rgb_frame.stride(0);
    let row_bytes = width as usize * VideoFrame::CHANNELS;
    let data = rgb_frame.data_mut(0);
    for y in 0..height {
        let dst_start = y as usize * stride;
        data[dst_start..dst_start + row_bytes].copy_from_slice(frame.row(y));
    }

    let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
    scaler.run(&rgb_frame, &mut yuv_frame)?;

    // The encoder rejects non-increasing timestamps.
    let pts = match track.last_pts {
        Some(last) if pts <= last => last + 1,
        _ => pts,
    };
    track.last_pts = Some(pts);
    yuv_frame.set_pts(Some(pts));

    track.encoder.send_frame(&yuv_frame)?;
    drain_packets(&mut track.encoder, track.stream_index, octx)
}

fn encode_audio(
    track: &mut AudioTrack,
    chunk: &AudioChunk,
    offset: i64,
    octx: &mut Output,
) -> Result<(), BoxError> {
    if track.next_pts.is_none() {
        track.next_pts = Some(offset.max(0));
    }
    track.pending.extend(chunk.to_mono());

    while track.pending.len() >= track.frame_size {
        let samples: Vec<f32> = track.pending.drain(..track.frame_size).collect();
        send_audio_frame(track, &samples, octx)?;
    }
    Ok(())
}

/// Encodes whatever is pending, zero-padded to a full frame.
fn flush_audio(track: &mut AudioTrack, octx: &mut Output) -> Result<(), BoxError> {
    if track.pending.is_empty() {
        return Ok(());
    }
    let mut samples = std::mem::take(&mut track.pending);
    samples.resize(track.frame_size, 0.0);
    send_audio_frame(track, &samples, octx)
}

fn send_audio_frame(
    track: &mut AudioTrack,
    samples: &[f32],
    octx: &mut Output,
) -> Result<(), BoxError> {
    let pts = track.next_pts.unwrap_or(0);
    let mut frame = ffmpeg_next::util::frame::audio::Audio::new(
        Sample::F32(SampleType::Planar),
        samples.len(),
        ChannelLayout::MONO,
    );
    frame.set_rate(track.sample_rate);
    frame.set_pts(Some(pts));

    let plane = frame.data_mut(0);
    for (dst, sample) in plane.chunks_exact_mut(4).zip(samples) {
        dst.copy_from_slice(&sample.to_ne_bytes());
    }

    track.encoder.send_frame(&frame)?;
    track.next_pts = Some(pts + samples.len() as i64);
    drain_packets(&mut track.encoder, track.stream_index, octx)
}

fn drain_packets(
    encoder: &mut Encoder,
    stream_index: usize,
    octx: &mut Output,
) -> Result<(), BoxError> {
    let encoder_time_base = encoder.time_base();
    let stream_time_base = octx
        .stream(stream_index)
        .ok_or("output stream missing")?
        .time_base();

    let mut packet = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(encoder_time_base, stream_time_base);
        packet.write_interleaved(octx)?;
    }
    Ok(())
}
