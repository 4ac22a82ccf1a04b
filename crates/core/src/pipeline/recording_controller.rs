use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::orientation::domain::orientation_mapper::VideoRotation;
use crate::recording::domain::container_writer::{
    ContainerWriter, ContainerWriterFactory, WriterSettings,
};
use crate::recording::domain::output_location::allocate_output_path;
use crate::recording::domain::recording_error::RecordingError;
use crate::recording::domain::recording_result::StopRecordingResult;
use crate::recording::domain::recording_state::RecordingState;
use crate::shared::callback_slot::CallbackSlot;
use crate::shared::media_time::MediaTime;
use crate::shared::sample_buffer::{SampleBuffer, Track};
use crate::shared::settings::Settings;

/// What happened to one buffer offered to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// No session is open.
    NotRecording,
    /// Earlier than the session start time.
    BeforeSession,
    /// The track input was not ready; the buffer is dropped.
    Backpressure,
    /// The writer failed and the session was abandoned.
    Failed,
}

/// Result of a stop request.
pub enum StopStatus {
    /// Finalization is running; the receiver yields its result.
    Finalizing(Receiver<StopRecordingResult>),
    NotRecording,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingSettings {
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub start_delay: Duration,
}

impl From<&Settings> for RecordingSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            width: settings.video_width,
            height: settings.video_height,
            sample_rate: settings.audio_sample_rate,
            channels: settings.audio_channels,
            start_delay: settings.start_delay(),
        }
    }
}

#[derive(Default)]
struct RecordingSession {
    state: RecordingState,
    output_path: Option<PathBuf>,
    writer: Option<Box<dyn ContainerWriter>>,
    session_start_time: Option<MediaTime>,
    start_requested_at: Option<MediaTime>,
}

impl RecordingSession {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Owns the single recording session and its start/stop state machine.
///
/// `start`/`stop` come from the caller context; `begin_session`, `append`
/// and `recording_time` come from the capture queue. The session mutex is
/// the only point where they meet, and file I/O for opening and finalizing
/// happens outside it.
pub struct RecordingController {
    session: Arc<Mutex<RecordingSession>>,
    writer_factory: Arc<dyn ContainerWriterFactory>,
    settings: RecordingSettings,
    on_complete: Arc<CallbackSlot<StopRecordingResult>>,
}

impl RecordingController {
    pub fn new(writer_factory: Arc<dyn ContainerWriterFactory>, settings: RecordingSettings) -> Self {
        Self {
            session: Arc::new(Mutex::new(RecordingSession::default())),
            writer_factory,
            settings,
            on_complete: Arc::new(CallbackSlot::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecordingSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RecordingState {
        self.lock().state
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.lock().output_path.clone()
    }

    pub fn session_start_time(&self) -> Option<MediaTime> {
        self.lock().session_start_time
    }

    /// Sink for results of recordings that end, by `stop` or by failure.
    pub fn on_complete(&self) -> &CallbackSlot<StopRecordingResult> {
        &self.on_complete
    }

    /// Opens a writer for a new file in `output_dir`, with the video track
    /// tagged with `rotation`.
    pub fn start(
        &self,
        rotation: VideoRotation,
        output_dir: &Path,
    ) -> Result<PathBuf, RecordingError> {
        {
            let mut session = self.lock();
            if session.state != RecordingState::Idle {
                return Err(RecordingError::AlreadyRecording);
            }
            session.state = RecordingState::WriterOpen;
        }

        match self.open_writer(rotation, output_dir) {
            Ok((path, writer)) => {
                let mut session = self.lock();
                session.output_path = Some(path.clone());
                session.writer = Some(writer);
                session.state = RecordingState::SessionPending;
                log::info!("recording to {}", path.display());
                Ok(path)
            }
            Err(e) => {
                self.lock().reset();
                log::warn!("{e}");
                Err(e)
            }
        }
    }

    fn open_writer(
        &self,
        rotation: VideoRotation,
        output_dir: &Path,
    ) -> Result<(PathBuf, Box<dyn ContainerWriter>), RecordingError> {
        let path = allocate_output_path(output_dir)
            .map_err(|e| RecordingError::WriterInitFailed(format!("{}: {e}", output_dir.display())))?;
        let settings = WriterSettings {
            width: self.settings.width,
            height: self.settings.height,
            rotation,
            sample_rate: self.settings.sample_rate,
            channels: self.settings.channels,
        };
        let mut writer = self
            .writer_factory
            .create(&path, &settings)
            .map_err(|e| RecordingError::WriterInitFailed(e.to_string()))?;
        writer
            .start_writing()
            .map_err(|e| RecordingError::WriterInitFailed(e.to_string()))?;
        Ok((path, writer))
    }

    /// Anchors the session on the first video buffer after `start`.
    ///
    /// Returns `true` when this call anchored it.
    pub fn begin_session(&self, presentation_time: MediaTime) -> bool {
        let mut session = self.lock();
        if session.state != RecordingState::SessionPending || session.start_requested_at.is_some() {
            return false;
        }
        let start = presentation_time.offset_by(self.settings.start_delay);
        let result = match session.writer.as_mut() {
            Some(writer) => writer.start_session(start),
            None => Err("writer missing".into()),
        };
        match result {
            Ok(()) => {
                session.start_requested_at = Some(presentation_time);
                session.session_start_time = Some(start);
                log::debug!("recording session anchored at {presentation_time}, starts at {start}");
                true
            }
            Err(e) => {
                session.reset();
                drop(session);
                self.abandon(RecordingError::WriteFailed(e.to_string()));
                false
            }
        }
    }

    /// Offers one buffer to the writer. Never blocks on the writer being
    /// busy: a track that is not ready drops the buffer.
    pub fn append(&self, buffer: &SampleBuffer) -> AppendOutcome {
        let mut session = self.lock();
        let pts = buffer.presentation_time();
        let start = match (session.state, session.session_start_time) {
            (RecordingState::SessionPending, Some(start)) if pts >= start => {
                session.state = RecordingState::SessionActive;
                log::debug!("recording session active at {pts}");
                start
            }
            (RecordingState::SessionActive, Some(start)) => start,
            (RecordingState::SessionPending, _) => return AppendOutcome::BeforeSession,
            _ => return AppendOutcome::NotRecording,
        };
        if pts < start {
            return AppendOutcome::BeforeSession;
        }

        let Some(writer) = session.writer.as_mut() else {
            return AppendOutcome::NotRecording;
        };
        if !writer.is_ready_for_more(buffer.track()) {
            log::trace!("{} input not ready, dropping buffer at {pts}", buffer.track());
            return AppendOutcome::Backpressure;
        }
        match writer.append(buffer) {
            Ok(()) => AppendOutcome::Appended,
            Err(e) => {
                session.reset();
                drop(session);
                self.abandon(RecordingError::WriteFailed(e.to_string()));
                AppendOutcome::Failed
            }
        }
    }

    /// Seconds of recorded media up to `presentation_time`; zero unless
    /// the session is active.
    pub fn recording_time(&self, presentation_time: MediaTime) -> f64 {
        let session = self.lock();
        match (session.state, session.session_start_time) {
            (RecordingState::SessionActive, Some(start)) => {
                presentation_time.seconds_since(start).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Finishes the open recording off the calling thread. The session stays
    /// in `Finishing` until the writer is finalized.
    pub fn stop(&self) -> StopStatus {
        let (writer, path) = {
            let mut session = self.lock();
            if !session.state.is_stoppable() {
                return StopStatus::NotRecording;
            }
            session.state = RecordingState::Finishing;
            (session.writer.take(), session.output_path.clone())
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let session = Arc::clone(&self.session);
        let on_complete = Arc::clone(&self.on_complete);
        std::thread::spawn(move || {
            let result = finalize(writer, path);
            session.lock().unwrap_or_else(|e| e.into_inner()).reset();
            match &result.error_message {
                Some(message) => log::warn!("{message}"),
                None => log::info!("recording finished"),
            }
            on_complete.emit(result.clone());
            let _ = tx.send(result);
        });
        StopStatus::Finalizing(rx)
    }

    fn abandon(&self, error: RecordingError) {
        log::warn!("recording abandoned: {error}");
        self.on_complete.emit(StopRecordingResult::failed(error.to_string()));
    }
}

fn finalize(writer: Option<Box<dyn ContainerWriter>>, path: Option<PathBuf>) -> StopRecordingResult {
    let Some(mut writer) = writer else {
        return StopRecordingResult::failed(
            RecordingError::WriterFinalizeFailed("writer missing".into()).to_string(),
        );
    };
    writer.mark_finished(Track::Video);
    writer.mark_finished(Track::Audio);
    match (writer.finish(), path) {
        (Ok(()), Some(path)) => StopRecordingResult::completed(path.to_string_lossy()),
        (Ok(()), None) => StopRecordingResult::failed(
            RecordingError::WriterFinalizeFailed("output path missing".into()).to_string(),
        ),
        (Err(e), _) => {
            StopRecordingResult::failed(RecordingError::WriterFinalizeFailed(e.to_string()).to_string())
        }
    }
}
