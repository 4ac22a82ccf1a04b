use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::Receiver;

use crate::capture::domain::camera_provider::{CameraProvider, CaptureSource};
use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::sample_sink::{QueueItem, SampleSink};
use crate::detection::domain::detection_error::DetectionError;
use crate::orientation::domain::device_orientation::CameraFacing;
use crate::orientation::domain::orientation_tracker::OrientationTracker;
use crate::pipeline::detection_gate::{DetectionGate, GateOutcome};
use crate::pipeline::pipeline_logger::{with_logger, PipelineCounter, SharedPipelineLogger};
use crate::pipeline::recording_controller::{AppendOutcome, RecordingController};
use crate::shared::constants::CAPTURE_QUEUE_CAPACITY;
use crate::shared::sample_buffer::{SampleBuffer, Track};

/// Dispatches each buffer taken off the capture queue.
///
/// Every buffer goes to the recorder; video buffers are then offered to the
/// detection gate, which never blocks.
pub struct SampleRouter {
    recorder: Arc<RecordingController>,
    gate: Arc<DetectionGate>,
    tracker: Arc<OrientationTracker>,
    logger: SharedPipelineLogger,
    warned_unconfigured: bool,
}

impl SampleRouter {
    pub fn new(
        recorder: Arc<RecordingController>,
        gate: Arc<DetectionGate>,
        tracker: Arc<OrientationTracker>,
        logger: SharedPipelineLogger,
    ) -> Self {
        Self {
            recorder,
            gate,
            tracker,
            logger,
            warned_unconfigured: false,
        }
    }

    pub fn route(&mut self, buffer: SampleBuffer) {
        match buffer.track() {
            Track::Audio => self.route_audio(&buffer),
            Track::Video => self.route_video(&buffer),
        }
    }

    fn route_audio(&mut self, buffer: &SampleBuffer) {
        self.count(PipelineCounter::AudioReceived);
        if self.append(buffer) == AppendOutcome::Appended {
            self.count(PipelineCounter::AudioAppended);
        }
    }

    fn route_video(&mut self, buffer: &SampleBuffer) {
        self.count(PipelineCounter::VideoReceived);
        let pts = buffer.presentation_time();
        let orientation = self.tracker.current();

        self.recorder.begin_session(pts);
        if self.append(buffer) == AppendOutcome::Appended {
            self.count(PipelineCounter::VideoAppended);
        }

        let recording_time = self.recorder.recording_time(pts);
        match self.gate.try_detect(buffer, orientation, recording_time) {
            Ok(GateOutcome::Submitted) => {}
            Ok(GateOutcome::Dropped) => {
                log::trace!("detector busy, frame at {pts} not analyzed");
                self.count(PipelineCounter::DetectionDropped);
            }
            Err(DetectionError::NotConfigured) => {
                if !self.warned_unconfigured {
                    log::warn!("face detection is not configured; frames are recorded only");
                    self.warned_unconfigured = true;
                }
            }
            Err(e) => log::debug!("frame at {pts} not offered for detection: {e}"),
        }
    }

    fn append(&self, buffer: &SampleBuffer) -> AppendOutcome {
        let started = Instant::now();
        let outcome = self.recorder.append(buffer);
        if outcome == AppendOutcome::Appended {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            with_logger(&self.logger, |l| l.timing("append", elapsed_ms));
        }
        outcome
    }

    fn count(&self, counter: PipelineCounter) {
        with_logger(&self.logger, |l| l.count(counter));
    }

    fn finish(&self) {
        with_logger(&self.logger, |l| l.summary());
    }
}

/// Owns the active capture source and the serial capture queue.
///
/// Sources push into a bounded channel from their own threads; a single
/// queue thread drains it in arrival order, so downstream components never
/// see two buffers at once.
pub struct CaptureSession {
    provider: Arc<dyn CameraProvider>,
    tracker: Arc<OrientationTracker>,
    sink: SampleSink,
    source: Mutex<Option<Box<dyn CaptureSource>>>,
    queue: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSession {
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        router: SampleRouter,
        tracker: Arc<OrientationTracker>,
    ) -> Self {
        let (sink, receiver) = SampleSink::bounded(CAPTURE_QUEUE_CAPACITY);
        let queue = spawn_queue(router, receiver);
        Self {
            provider,
            tracker,
            sink,
            source: Mutex::new(None),
            queue: Mutex::new(Some(queue)),
        }
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<Box<dyn CaptureSource>>> {
        self.source.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Entry point of the capture queue.
    pub fn sink(&self) -> SampleSink {
        self.sink.clone()
    }

    pub fn active_facing(&self) -> Option<CameraFacing> {
        self.lock_source().as_ref().map(|source| source.facing())
    }

    /// Switches capture to the camera for `facing`. Does nothing when that
    /// camera is already running. The current camera keeps running if the
    /// new one cannot be resolved.
    pub fn configure(&self, facing: CameraFacing) -> Result<(), CaptureError> {
        let mut current = self.lock_source();
        if current.as_ref().is_some_and(|source| source.facing() == facing) {
            log::debug!("{facing} camera already active");
            return Ok(());
        }

        let mut next = self.provider.open_camera(facing)?;
        if let Some(mut previous) = current.take() {
            previous.stop();
            log::debug!("stopped {} camera", previous.facing());
        }
        next.start(self.sink.clone())?;
        *current = Some(next);
        self.tracker.set_camera_facing(facing);
        log::info!("capturing from {facing} camera");
        Ok(())
    }

    /// Blocks until every buffer pushed before this call has been routed.
    pub fn flush(&self) -> Result<(), CaptureError> {
        let (ack, done) = crossbeam_channel::bounded(1);
        if !self.sink.send(QueueItem::Flush(ack)) {
            return Err(CaptureError::SessionClosed);
        }
        done.recv().map_err(|_| CaptureError::SessionClosed)
    }

    /// Waits for the active source to deliver its last buffer, then drains
    /// the queue.
    pub fn wait_for_source(&self) -> Result<(), CaptureError> {
        if let Some(source) = self.lock_source().as_mut() {
            source.wait_until_finished();
        }
        self.flush()
    }

    pub fn stop_source(&self) {
        if let Some(mut source) = self.lock_source().take() {
            source.stop();
        }
    }

    /// Stops capture and the queue thread. Buffers already queued are routed
    /// first.
    pub fn shutdown(&self) {
        self.stop_source();
        let handle = self.queue.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            self.sink.send(QueueItem::Shutdown);
            if handle.join().is_err() {
                log::error!("capture queue panicked");
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_queue(mut router: SampleRouter, items: Receiver<QueueItem>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for item in items {
            match item {
                QueueItem::Sample(buffer) => router.route(buffer),
                QueueItem::Flush(ack) => {
                    let _ = ack.send(());
                }
                QueueItem::Shutdown => break,
            }
        }
        router.finish();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_config::DetectionConfig;
    use crate::orientation::domain::device_orientation::DeviceOrientation;
    use crate::orientation::domain::orientation_mapper::VideoRotation;
    use crate::pipeline::pipeline_logger::{LogPipelineLogger, NullPipelineLogger};
    use crate::pipeline::recording_controller::RecordingSettings;
    use crate::pipeline::test_support::{
        audio_at, video_at, FakeCameraProvider, FakeDetector, FakeWriterFactory, WriterEvent,
    };
    use crate::shared::media_time::MediaTime;
    use crate::shared::settings::Settings;

    struct Harness {
        session: CaptureSession,
        writer: Arc<FakeWriterFactory>,
        recorder: Arc<RecordingController>,
        provider: Arc<FakeCameraProvider>,
        tracker: Arc<OrientationTracker>,
        logger: Arc<Mutex<LogPipelineLogger>>,
        dir: tempfile::TempDir,
    }

    fn harness(detector: FakeDetector, configure: bool) -> Harness {
        let writer = Arc::new(FakeWriterFactory::default());
        let recorder = Arc::new(RecordingController::new(
            writer.clone(),
            RecordingSettings::from(&Settings::default()),
        ));
        let logger = LogPipelineLogger::shared(1000);
        let gate = Arc::new(DetectionGate::new(Box::new(detector), logger.clone()));
        if configure {
            gate.configure(DetectionConfig::default()).unwrap();
        }
        let tracker = Arc::new(OrientationTracker::new(
            DeviceOrientation::Portrait,
            CameraFacing::Back,
        ));
        let provider = Arc::new(FakeCameraProvider::new(&[CameraFacing::Back, CameraFacing::Front]));
        let router = SampleRouter::new(recorder.clone(), gate, tracker.clone(), logger.clone());
        Harness {
            session: CaptureSession::new(provider.clone(), router, tracker.clone()),
            writer,
            recorder,
            provider,
            tracker,
            logger,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    #[test]
    fn test_recorder_sees_buffers_in_arrival_order() {
        let h = harness(FakeDetector::returning(vec![]), false);
        h.recorder.start(VideoRotation::Identity, h.dir.path()).unwrap();
        let sink = h.session.sink();

        sink.push(video_at(0, 0));
        for i in 1..=6 {
            let millis = i * 100;
            if i % 2 == 0 {
                sink.push(video_at(millis, i as usize));
            } else {
                sink.push(audio_at(millis));
            }
        }
        h.session.flush().unwrap();

        let appended: Vec<(Track, MediaTime)> = h
            .writer
            .events()
            .into_iter()
            .filter_map(|event| match event {
                WriterEvent::Appended(track, at) => Some((track, at)),
                _ => None,
            })
            .collect();
        // the session starts 300ms after the first video frame
        assert_eq!(
            appended,
            vec![
                (Track::Audio, MediaTime::new(300, 1000)),
                (Track::Video, MediaTime::new(400, 1000)),
                (Track::Audio, MediaTime::new(500, 1000)),
                (Track::Video, MediaTime::new(600, 1000)),
            ]
        );
    }

    #[test]
    fn test_busy_detector_never_stalls_recording() {
        let (detector, release) = FakeDetector::blocking(vec![]);
        let h = harness(detector, true);
        h.recorder.start(VideoRotation::Identity, h.dir.path()).unwrap();
        let sink = h.session.sink();

        for i in 0..10 {
            sink.push(video_at(i * 100, i as usize));
        }
        h.session.flush().unwrap();

        // 7 of 10 frames lie at or after the 300ms session start
        assert_eq!(h.writer.appended(Track::Video).len(), 7);
        let logger = h.logger.lock().unwrap();
        assert_eq!(logger.counter(PipelineCounter::VideoReceived), 10);
        assert_eq!(logger.counter(PipelineCounter::DetectionDropped), 9);
        drop(logger);
        release.send(()).unwrap();
    }

    #[test]
    fn test_audio_counts_without_recording() {
        let h = harness(FakeDetector::returning(vec![]), false);
        let sink = h.session.sink();

        sink.push(audio_at(0));
        sink.push(audio_at(10));
        h.session.flush().unwrap();

        let logger = h.logger.lock().unwrap();
        assert_eq!(logger.counter(PipelineCounter::AudioReceived), 2);
        assert_eq!(logger.counter(PipelineCounter::AudioAppended), 0);
    }

    #[test]
    fn test_configure_missing_camera_is_device_unavailable() {
        let writer = Arc::new(FakeWriterFactory::default());
        let recorder = Arc::new(RecordingController::new(
            writer,
            RecordingSettings::from(&Settings::default()),
        ));
        let logger = NullPipelineLogger::shared();
        let gate = Arc::new(DetectionGate::new(
            Box::new(FakeDetector::returning(vec![])),
            logger.clone(),
        ));
        let tracker = Arc::new(OrientationTracker::default());
        let router = SampleRouter::new(recorder, gate, tracker.clone(), logger);
        let provider = Arc::new(FakeCameraProvider::new(&[CameraFacing::Back]));
        let session = CaptureSession::new(provider, router, tracker);

        let result = session.configure(CameraFacing::Front);

        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert_eq!(session.active_facing(), None);
    }

    #[test]
    fn test_configure_is_idempotent_per_facing() {
        let h = harness(FakeDetector::returning(vec![]), false);

        h.session.configure(CameraFacing::Back).unwrap();
        h.session.configure(CameraFacing::Back).unwrap();
        assert_eq!(h.provider.opened.lock().unwrap().as_slice(), &[CameraFacing::Back]);

        h.session.configure(CameraFacing::Front).unwrap();
        assert_eq!(
            h.provider.opened.lock().unwrap().as_slice(),
            &[CameraFacing::Back, CameraFacing::Front]
        );
        assert_eq!(h.provider.stopped.lock().unwrap().as_slice(), &[CameraFacing::Back]);
        assert_eq!(h.session.active_facing(), Some(CameraFacing::Front));
    }

    #[test]
    fn test_configure_updates_tracker_facing() {
        let h = harness(FakeDetector::returning(vec![]), false);

        h.session.configure(CameraFacing::Front).unwrap();

        assert_eq!(h.tracker.camera_facing(), CameraFacing::Front);
    }

    #[test]
    fn test_shutdown_closes_sink() {
        let h = harness(FakeDetector::returning(vec![]), false);
        h.session.configure(CameraFacing::Back).unwrap();
        let sink = h.session.sink();

        h.session.shutdown();

        assert!(!sink.push(video_at(0, 0)));
        assert!(matches!(h.session.flush(), Err(CaptureError::SessionClosed)));
        assert_eq!(h.provider.stopped.lock().unwrap().as_slice(), &[CameraFacing::Back]);
    }

    #[test]
    fn test_summary_is_reported_on_shutdown() {
        let h = harness(FakeDetector::returning(vec![]), false);
        h.session.sink().push(audio_at(0));
        h.session.shutdown();

        assert!(h.logger.lock().unwrap().summary_string().is_some());
    }
}
