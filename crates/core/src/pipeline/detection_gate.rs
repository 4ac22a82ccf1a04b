use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::detection_event::DetectionEvent;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::detection::domain::face_remapper::remap_faces;
use crate::orientation::domain::orientation_mapper::{ImageOrientation, OrientationState};
use crate::pipeline::pipeline_logger::{with_logger, PipelineCounter, SharedPipelineLogger};
use crate::shared::callback_slot::CallbackSlot;
use crate::shared::frame::VideoFrame;
use crate::shared::sample_buffer::SampleBuffer;

/// What `try_detect` did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Submitted,
    /// A detection was already in flight; the frame is not analyzed.
    Dropped,
}

struct DetectionJob {
    frame: Arc<VideoFrame>,
    orientation: OrientationState,
    recording_time: f64,
}

enum WorkerCommand {
    Configure {
        config: DetectionConfig,
        reply: Sender<Result<(), DetectionError>>,
    },
    Detect(DetectionJob),
    Recognize {
        frame: VideoFrame,
        reply: Sender<Result<Vec<FaceRecord>, DetectionError>>,
    },
    Shutdown,
}

struct Workers {
    detector: JoinHandle<()>,
    delivery: JoinHandle<()>,
}

/// Single-flight front of the detection capability.
///
/// The detector lives on its own worker thread and handles one command at a
/// time. `busy` is set by `try_detect` and cleared by the worker before the
/// event is handed on, so at most one live detection is ever outstanding and
/// the capture queue never waits for one.
///
/// Events reach `on_detection` from a separate delivery thread, so a
/// callback may call back into the gate (`configure`, `recognize_still`)
/// without waiting on the worker it is running on.
pub struct DetectionGate {
    commands: Sender<WorkerCommand>,
    busy: Arc<AtomicBool>,
    configured: AtomicBool,
    on_detection: Arc<CallbackSlot<DetectionEvent>>,
    workers: Mutex<Option<Workers>>,
}

impl DetectionGate {
    pub fn new(detector: Box<dyn FaceDetector>, logger: SharedPipelineLogger) -> Self {
        let (commands, receiver) = crossbeam_channel::unbounded();
        let busy = Arc::new(AtomicBool::new(false));
        let on_detection = Arc::new(CallbackSlot::new());
        let (events, deliveries) = crossbeam_channel::unbounded();

        let workers = Workers {
            detector: spawn_worker(detector, receiver, Arc::clone(&busy), events, logger),
            delivery: spawn_delivery(deliveries, Arc::clone(&on_detection)),
        };

        Self {
            commands,
            busy,
            configured: AtomicBool::new(false),
            on_detection,
            workers: Mutex::new(Some(workers)),
        }
    }

    pub fn on_detection(&self) -> &CallbackSlot<DetectionEvent> {
        &self.on_detection
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// Rebuilds the detector. Queued behind any detection already running,
    /// which finishes with the configuration it started with.
    pub fn configure(&self, config: DetectionConfig) -> Result<(), DetectionError> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.commands
            .send(WorkerCommand::Configure { config, reply })
            .map_err(|_| DetectionError::WorkerStopped)?;
        response.recv().map_err(|_| DetectionError::WorkerStopped)??;
        self.configured.store(true, Ordering::Release);
        log::debug!("detector configured: {config:?}");
        Ok(())
    }

    /// Offers a video buffer for analysis without blocking.
    pub fn try_detect(
        &self,
        buffer: &SampleBuffer,
        orientation: OrientationState,
        recording_time: f64,
    ) -> Result<GateOutcome, DetectionError> {
        if !self.is_configured() {
            return Err(DetectionError::NotConfigured);
        }
        let Some(frame) = buffer.video_frame() else {
            return Ok(GateOutcome::Dropped);
        };
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(GateOutcome::Dropped);
        }

        let job = DetectionJob {
            frame: Arc::clone(frame),
            orientation,
            recording_time,
        };
        if self.commands.send(WorkerCommand::Detect(job)).is_err() {
            self.busy.store(false, Ordering::Release);
            return Err(DetectionError::WorkerStopped);
        }
        Ok(GateOutcome::Submitted)
    }

    /// One-shot detection on an upright still image. Waits behind any live
    /// detection in flight. No faces is a failure on this path.
    pub fn recognize_still(&self, frame: VideoFrame) -> Result<Vec<FaceRecord>, DetectionError> {
        if !self.is_configured() {
            return Err(DetectionError::NotConfigured);
        }
        let (reply, response) = crossbeam_channel::bounded(1);
        self.commands
            .send(WorkerCommand::Recognize { frame, reply })
            .map_err(|_| DetectionError::WorkerStopped)?;
        response.recv().map_err(|_| DetectionError::WorkerStopped)?
    }

    /// Stops the worker after the command it is running. Events already
    /// produced are still delivered.
    pub fn shutdown(&self) {
        let workers = self.workers.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(workers) = workers {
            let _ = self.commands.send(WorkerCommand::Shutdown);
            join(workers.detector, "detection worker");
            // the delivery thread ends once the worker's sender is gone
            join(workers.delivery, "detection delivery");
        }
    }
}

/// Joins `handle` unless it is the calling thread, as when a detection
/// callback shuts the gate down.
fn join(handle: JoinHandle<()>, name: &str) {
    if handle.thread().id() == thread::current().id() {
        return;
    }
    if handle.join().is_err() {
        log::error!("{name} panicked");
    }
}

impl Drop for DetectionGate {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(
    mut detector: Box<dyn FaceDetector>,
    commands: Receiver<WorkerCommand>,
    busy: Arc<AtomicBool>,
    events: Sender<DetectionEvent>,
    logger: SharedPipelineLogger,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for command in commands {
            match command {
                WorkerCommand::Configure { config, reply } => {
                    let result = detector
                        .configure(&config)
                        .map_err(|e| DetectionError::ConfigureFailed(e.to_string()));
                    let _ = reply.send(result);
                }
                WorkerCommand::Detect(job) => {
                    let event = run_detection(&mut *detector, &job, &logger);
                    busy.store(false, Ordering::Release);
                    if let Some(event) = event {
                        with_logger(&logger, |l| l.count(PipelineCounter::DetectionEvents));
                        let _ = events.send(event);
                    }
                }
                WorkerCommand::Recognize { frame, reply } => {
                    let _ = reply.send(recognize(&mut *detector, &frame));
                }
                WorkerCommand::Shutdown => break,
            }
        }
    })
}

fn spawn_delivery(
    events: Receiver<DetectionEvent>,
    on_detection: Arc<CallbackSlot<DetectionEvent>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            on_detection.emit(event);
        }
    })
}

/// Live path: errors and missing results produce no event; an empty face
/// list is still an event.
fn run_detection(
    detector: &mut dyn FaceDetector,
    job: &DetectionJob,
    logger: &SharedPipelineLogger,
) -> Option<DetectionEvent> {
    let started = Instant::now();
    let result = detector.detect(&job.frame, job.orientation.image_orientation);
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    with_logger(logger, |l| l.timing("detect", elapsed_ms));

    let faces = match result {
        Ok(Some(faces)) => faces,
        Ok(None) => {
            log::debug!("detector returned no result for frame {}", job.frame.index());
            return None;
        }
        Err(e) => {
            log::debug!("detection failed on frame {}: {e}", job.frame.index());
            return None;
        }
    };

    let (width, height) = (job.frame.width(), job.frame.height());
    let (out_width, out_height) = job.orientation.oriented_dimensions(width, height);
    Some(DetectionEvent {
        faces: remap_faces(faces, &job.orientation, width, height),
        width: out_width,
        height: out_height,
        recording_time: job.recording_time,
    })
}

fn recognize(
    detector: &mut dyn FaceDetector,
    frame: &VideoFrame,
) -> Result<Vec<FaceRecord>, DetectionError> {
    match detector.detect(frame, ImageOrientation::TopLeft) {
        Ok(Some(faces)) if !faces.is_empty() => Ok(faces),
        Ok(_) => Err(DetectionError::RecognitionFailed("no faces detected".into())),
        Err(e) => Err(DetectionError::RecognitionFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_record::{FacePoint, LandmarkKind};
    use crate::orientation::domain::device_orientation::{CameraFacing, DeviceOrientation};
    use crate::orientation::domain::orientation_mapper::map;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::pipeline::test_support::{audio_at, video_at, FakeDetector, WAIT};
    use std::collections::BTreeMap;

    fn face() -> FaceRecord {
        FaceRecord {
            head_euler_angle_y: Some(10.0),
            landmarks: BTreeMap::from([(LandmarkKind::NoseBase, FacePoint::new(2.0, 1.0))]),
            ..FaceRecord::default()
        }
    }

    fn gate_with(detector: FakeDetector) -> (DetectionGate, Receiver<DetectionEvent>) {
        let gate = DetectionGate::new(Box::new(detector), NullPipelineLogger::shared());
        gate.configure(DetectionConfig::default()).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        gate.on_detection().set(Box::new(move |event| {
            let _ = tx.send(event);
        }));
        (gate, rx)
    }

    fn upright() -> OrientationState {
        OrientationState::upright()
    }

    #[test]
    fn test_unconfigured_gate_rejects_frames() {
        let gate = DetectionGate::new(
            Box::new(FakeDetector::returning(vec![])),
            NullPipelineLogger::shared(),
        );

        let result = gate.try_detect(&video_at(0, 0), upright(), 0.0);

        assert!(matches!(result, Err(DetectionError::NotConfigured)));
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_configure_reaches_detector() {
        let detector = FakeDetector::returning(vec![]);
        let configured = Arc::clone(&detector.configured);
        let gate = DetectionGate::new(Box::new(detector), NullPipelineLogger::shared());
        let config = DetectionConfig {
            min_face_size: 0.5,
            ..DetectionConfig::default()
        };

        gate.configure(config).unwrap();

        assert_eq!(configured.lock().unwrap().as_slice(), &[config]);
        assert!(gate.is_configured());
    }

    #[test]
    fn test_busy_gate_drops_frames_without_blocking() {
        let (detector, release) = FakeDetector::blocking(vec![face()]);
        let max_in_flight = Arc::clone(&detector.max_in_flight);
        let (gate, events) = gate_with(detector);

        assert_eq!(
            gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap(),
            GateOutcome::Submitted
        );
        for i in 1..5 {
            assert_eq!(
                gate.try_detect(&video_at(i * 33, i as usize), upright(), 0.0).unwrap(),
                GateOutcome::Dropped
            );
        }

        release.send(()).unwrap();
        events.recv_timeout(WAIT).unwrap();
        assert!(events.try_recv().is_err());
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_reopens_after_event() {
        let (gate, events) = gate_with(FakeDetector::returning(vec![face()]));

        for i in 0..3 {
            // busy is cleared before the event is emitted
            let outcome = gate.try_detect(&video_at(i * 33, i as usize), upright(), 0.0);
            assert_eq!(outcome.unwrap(), GateOutcome::Submitted);
            events.recv_timeout(WAIT).unwrap();
        }
    }

    #[test]
    fn test_event_is_remapped_for_orientation() {
        let (gate, events) = gate_with(FakeDetector::returning(vec![face()]));
        let state = map(DeviceOrientation::Portrait, CameraFacing::Back);

        gate.try_detect(&video_at(0, 0), state, 1.25).unwrap();
        let event = events.recv_timeout(WAIT).unwrap();

        // 8x6 sensor frame rotated to 6x8
        assert_eq!((event.width, event.height), (6, 8));
        approx::assert_relative_eq!(event.recording_time, 1.25);
        let nose = event.faces[0].landmarks[&LandmarkKind::NoseBase];
        approx::assert_relative_eq!(nose.x, 6.0 - 1.0);
        approx::assert_relative_eq!(nose.y, 2.0);
        assert_eq!(event.faces[0].head_euler_angle_y, Some(-10.0));
    }

    #[test]
    fn test_empty_result_still_emits_event() {
        let (gate, events) = gate_with(FakeDetector::returning(vec![]));

        gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap();

        let event = events.recv_timeout(WAIT).unwrap();
        assert!(event.faces.is_empty());
        assert_eq!((event.width, event.height), (8, 6));
    }

    #[test]
    fn test_detector_error_emits_nothing_and_clears_busy() {
        let mut detector = FakeDetector::returning(vec![face()]);
        detector.fail = true;
        let (gate, events) = gate_with(detector);

        gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap();
        // a configure round-trip is queued behind the detection
        gate.configure(DetectionConfig::default()).unwrap();

        assert!(!gate.is_busy());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_missing_result_emits_nothing() {
        let mut detector = FakeDetector::returning(vec![face()]);
        detector.no_result = true;
        let (gate, events) = gate_with(detector);

        gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap();
        gate.configure(DetectionConfig::default()).unwrap();

        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_audio_buffers_are_not_analyzed() {
        let (gate, _events) = gate_with(FakeDetector::returning(vec![]));
        assert_eq!(
            gate.try_detect(&audio_at(0), upright(), 0.0).unwrap(),
            GateOutcome::Dropped
        );
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_still_recognition_returns_faces() {
        let (gate, events) = gate_with(FakeDetector::returning(vec![face()]));

        let faces = gate.recognize_still(VideoFrame::filled(8, 6, 0, 0)).unwrap();

        assert_eq!(faces, vec![face()]);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_still_recognition_with_no_faces_fails() {
        let (gate, _events) = gate_with(FakeDetector::returning(vec![]));

        let result = gate.recognize_still(VideoFrame::filled(8, 6, 0, 0));

        assert!(matches!(result, Err(DetectionError::RecognitionFailed(_))));
    }

    #[test]
    fn test_still_recognition_error_fails() {
        let mut detector = FakeDetector::returning(vec![face()]);
        detector.fail = true;
        let (gate, _events) = gate_with(detector);

        let result = gate.recognize_still(VideoFrame::filled(8, 6, 0, 0));

        assert!(matches!(result, Err(DetectionError::RecognitionFailed(m)) if m.contains("model crashed")));
    }

    #[test]
    fn test_still_recognition_requires_configuration() {
        let gate = DetectionGate::new(
            Box::new(FakeDetector::returning(vec![face()])),
            NullPipelineLogger::shared(),
        );
        let result = gate.recognize_still(VideoFrame::filled(8, 6, 0, 0));
        assert!(matches!(result, Err(DetectionError::NotConfigured)));
    }

    #[test]
    fn test_callback_can_reconfigure_gate() {
        let gate = Arc::new(DetectionGate::new(
            Box::new(FakeDetector::returning(vec![face()])),
            NullPipelineLogger::shared(),
        ));
        gate.configure(DetectionConfig::default()).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let weak = Arc::downgrade(&gate);
        gate.on_detection().set(Box::new(move |event| {
            let reconfigured = weak.upgrade().map(|gate| {
                gate.configure(DetectionConfig {
                    min_face_size: 0.3,
                    ..DetectionConfig::default()
                })
            });
            let _ = tx.send((event, reconfigured));
        }));

        gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap();
        let (_, reconfigured) = rx.recv_timeout(WAIT).unwrap();
        assert!(matches!(reconfigured, Some(Ok(()))));

        assert_eq!(
            gate.try_detect(&video_at(33, 1), upright(), 0.0).unwrap(),
            GateOutcome::Submitted
        );
        let (event, _) = rx.recv_timeout(WAIT).unwrap();
        assert_eq!(event.faces.len(), 1);
        gate.on_detection().clear();
    }

    #[test]
    fn test_callback_can_recognize_stills() {
        let (gate, _) = gate_with(FakeDetector::returning(vec![face()]));
        let gate = Arc::new(gate);
        let (tx, rx) = crossbeam_channel::unbounded();
        let weak = Arc::downgrade(&gate);
        gate.on_detection().set(Box::new(move |_| {
            if let Some(gate) = weak.upgrade() {
                let _ = tx.send(gate.recognize_still(VideoFrame::filled(8, 6, 0, 0)));
            }
        }));

        gate.try_detect(&video_at(0, 0), upright(), 0.0).unwrap();

        assert_eq!(rx.recv_timeout(WAIT).unwrap().unwrap(), vec![face()]);
        assert!(!gate.is_busy());
        gate.on_detection().clear();
    }

    #[test]
    fn test_shutdown_stops_worker() {
        let (gate, _events) = gate_with(FakeDetector::returning(vec![]));
        gate.shutdown();

        let result = gate.try_detect(&video_at(0, 0), upright(), 0.0);

        assert!(matches!(result, Err(DetectionError::WorkerStopped)));
        assert!(!gate.is_busy());
    }
}
