//! Port fakes shared by the pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::camera_provider::{CameraProvider, CaptureSource};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::sample_sink::SampleSink;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::orientation::domain::device_orientation::CameraFacing;
use crate::orientation::domain::orientation_mapper::ImageOrientation;
use crate::recording::domain::container_writer::{
    ContainerWriter, ContainerWriterFactory, WriterSettings,
};
use crate::shared::audio_chunk::AudioChunk;
use crate::shared::error::BoxError;
use crate::shared::frame::VideoFrame;
use crate::shared::media_time::MediaTime;
use crate::shared::sample_buffer::{SampleBuffer, Track};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn video_at(millis: i64, index: usize) -> SampleBuffer {
    SampleBuffer::video(VideoFrame::filled(8, 6, 0, index), MediaTime::new(millis, 1000))
}

pub fn audio_at(millis: i64) -> SampleBuffer {
    SampleBuffer::audio(AudioChunk::silence(160, 16000, 1), MediaTime::new(millis, 1000))
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriterEvent {
    Created(PathBuf, WriterSettings),
    Session(MediaTime),
    Appended(Track, MediaTime),
    Finished(Track),
    Finalized,
}

/// Writer factory that records every call and can be told to fail.
#[derive(Default)]
pub struct FakeWriterFactory {
    pub events: Arc<Mutex<Vec<WriterEvent>>>,
    pub fail_create: AtomicBool,
    pub fail_session: Arc<AtomicBool>,
    pub fail_append: Arc<AtomicBool>,
    pub fail_finish: Arc<AtomicBool>,
    pub backpressure: Arc<AtomicBool>,
    /// When set, `finish` blocks until a message arrives.
    pub finish_gate: Mutex<Option<Receiver<()>>>,
}

impl FakeWriterFactory {
    pub fn events(&self) -> Vec<WriterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn appended(&self, track: Track) -> Vec<MediaTime> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                WriterEvent::Appended(t, at) if t == track => Some(at),
                _ => None,
            })
            .collect()
    }

    pub fn hold_finish(&self) -> Sender<()> {
        let (tx, rx) = crossbeam_channel::unbounded();
        *self.finish_gate.lock().unwrap() = Some(rx);
        tx
    }
}

impl ContainerWriterFactory for FakeWriterFactory {
    fn create(
        &self,
        path: &Path,
        settings: &WriterSettings,
    ) -> Result<Box<dyn ContainerWriter>, BoxError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("disk full".into());
        }
        self.events
            .lock()
            .unwrap()
            .push(WriterEvent::Created(path.to_path_buf(), *settings));
        Ok(Box::new(FakeWriter {
            events: Arc::clone(&self.events),
            fail_session: Arc::clone(&self.fail_session),
            fail_append: Arc::clone(&self.fail_append),
            fail_finish: Arc::clone(&self.fail_finish),
            backpressure: Arc::clone(&self.backpressure),
            finish_gate: self.finish_gate.lock().unwrap().take(),
        }))
    }
}

struct FakeWriter {
    events: Arc<Mutex<Vec<WriterEvent>>>,
    fail_session: Arc<AtomicBool>,
    fail_append: Arc<AtomicBool>,
    fail_finish: Arc<AtomicBool>,
    backpressure: Arc<AtomicBool>,
    finish_gate: Option<Receiver<()>>,
}

impl FakeWriter {
    fn record(&self, event: WriterEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ContainerWriter for FakeWriter {
    fn start_writing(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) -> Result<(), BoxError> {
        if self.fail_session.load(Ordering::SeqCst) {
            return Err("session rejected".into());
        }
        self.record(WriterEvent::Session(at));
        Ok(())
    }

    fn is_ready_for_more(&self, _track: Track) -> bool {
        !self.backpressure.load(Ordering::SeqCst)
    }

    fn append(&mut self, buffer: &SampleBuffer) -> Result<(), BoxError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err("encoder crashed".into());
        }
        self.record(WriterEvent::Appended(buffer.track(), buffer.presentation_time()));
        Ok(())
    }

    fn mark_finished(&mut self, track: Track) {
        self.record(WriterEvent::Finished(track));
    }

    fn finish(self: Box<Self>) -> Result<(), BoxError> {
        if let Some(gate) = &self.finish_gate {
            let _ = gate.recv_timeout(WAIT);
        }
        if self.fail_finish.load(Ordering::SeqCst) {
            return Err("trailer write failed".into());
        }
        self.record(WriterEvent::Finalized);
        Ok(())
    }
}

/// Detector returning a fixed face list, optionally blocking each call
/// until released.
pub struct FakeDetector {
    pub faces: Vec<FaceRecord>,
    pub fail: bool,
    pub no_result: bool,
    pub release: Option<Receiver<()>>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub configured: Arc<Mutex<Vec<DetectionConfig>>>,
}

impl FakeDetector {
    pub fn returning(faces: Vec<FaceRecord>) -> Self {
        Self {
            faces,
            fail: false,
            no_result: false,
            release: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            configured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A detector whose calls each wait for one message on the returned sender.
    pub fn blocking(faces: Vec<FaceRecord>) -> (Self, Sender<()>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut detector = Self::returning(faces);
        detector.release = Some(rx);
        (detector, tx)
    }
}

impl FaceDetector for FakeDetector {
    fn configure(&mut self, config: &DetectionConfig) -> Result<(), BoxError> {
        self.configured.lock().unwrap().push(*config);
        Ok(())
    }

    fn detect(
        &mut self,
        _frame: &VideoFrame,
        _orientation: ImageOrientation,
    ) -> Result<Option<Vec<FaceRecord>>, BoxError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(release) = &self.release {
            let _ = release.recv_timeout(WAIT);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err("model crashed".into());
        }
        if self.no_result {
            return Ok(None);
        }
        Ok(Some(self.faces.clone()))
    }
}

/// Provider serving `facings`; sources never push on their own, tests feed
/// the capture queue through its sink.
pub struct FakeCameraProvider {
    pub facings: Vec<CameraFacing>,
    pub opened: Arc<Mutex<Vec<CameraFacing>>>,
    pub stopped: Arc<Mutex<Vec<CameraFacing>>>,
}

impl FakeCameraProvider {
    pub fn new(facings: &[CameraFacing]) -> Self {
        Self {
            facings: facings.to_vec(),
            opened: Arc::new(Mutex::new(Vec::new())),
            stopped: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl CameraProvider for FakeCameraProvider {
    fn open_camera(&self, facing: CameraFacing) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if !self.facings.contains(&facing) {
            return Err(CaptureError::DeviceUnavailable(format!("no {facing} camera")));
        }
        self.opened.lock().unwrap().push(facing);
        Ok(Box::new(FakeSource {
            facing,
            stopped: Arc::clone(&self.stopped),
            sink: None,
        }))
    }
}

struct FakeSource {
    facing: CameraFacing,
    stopped: Arc<Mutex<Vec<CameraFacing>>>,
    sink: Option<SampleSink>,
}

impl CaptureSource for FakeSource {
    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn start(&mut self, sink: SampleSink) -> Result<(), CaptureError> {
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if self.sink.take().is_some() {
            self.stopped.lock().unwrap().push(self.facing);
        }
    }

    fn wait_until_finished(&mut self) {}
}
