use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Receiver;

use crate::capture::domain::camera_provider::CameraProvider;
use crate::detection::domain::detection_config::{DetectionConfig, DetectionOptions};
use crate::detection::domain::detection_event::DetectionEvent;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::FaceRecord;
use crate::detection::infrastructure::image_frame_reader::{read_image_bytes, read_image_file};
use crate::orientation::domain::device_orientation::{CameraFacing, DeviceOrientation};
use crate::orientation::domain::orientation_tracker::OrientationTracker;
use crate::pipeline::capture_session::{CaptureSession, SampleRouter};
use crate::pipeline::detection_gate::DetectionGate;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::SharedPipelineLogger;
use crate::pipeline::recording_controller::{RecordingController, RecordingSettings, StopStatus};
use crate::recording::domain::container_writer::ContainerWriterFactory;
use crate::recording::domain::output_location::default_output_dir;
use crate::recording::domain::recording_error::RecordingError;
use crate::recording::domain::recording_result::{
    RecordingOptions, StartRecordingResult, StopRecordingResult,
};
use crate::recording::domain::recording_state::RecordingState;
use crate::shared::callback_slot::CallbackSlot;
use crate::shared::settings::Settings;

/// The caller-facing camera pipeline.
///
/// Wires a capture session, a recording controller and a detection gate
/// together. All methods may be called from any thread; capture and
/// detection results arrive through the callback slots.
pub struct CameraPipeline {
    capture: CaptureSession,
    recorder: Arc<RecordingController>,
    gate: Arc<DetectionGate>,
    tracker: Arc<OrientationTracker>,
    detection_config: Mutex<DetectionConfig>,
    output_dir: Option<PathBuf>,
}

impl CameraPipeline {
    /// Builds an idle pipeline. No camera runs until `set_camera_facing`,
    /// and detection stays off until `update_options`.
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        detector: Box<dyn FaceDetector>,
        writer_factory: Arc<dyn ContainerWriterFactory>,
        settings: &Settings,
        logger: SharedPipelineLogger,
    ) -> Self {
        let tracker = Arc::new(OrientationTracker::new(
            DeviceOrientation::Portrait,
            settings.camera_facing,
        ));
        let recorder = Arc::new(RecordingController::new(
            writer_factory,
            RecordingSettings::from(settings),
        ));
        let gate = Arc::new(DetectionGate::new(detector, Arc::clone(&logger)));
        let router = SampleRouter::new(
            Arc::clone(&recorder),
            Arc::clone(&gate),
            Arc::clone(&tracker),
            logger,
        );

        Self {
            capture: CaptureSession::new(provider, router, Arc::clone(&tracker)),
            recorder,
            gate,
            tracker,
            detection_config: Mutex::new(settings.detection),
            output_dir: settings.output_dir.clone(),
        }
    }

    pub fn set_camera_facing(&self, facing: CameraFacing) -> Result<(), PipelineError> {
        self.capture.configure(facing)?;
        Ok(())
    }

    pub fn set_device_orientation(&self, orientation: DeviceOrientation) {
        self.tracker.set_device_orientation(orientation);
    }

    pub fn camera_facing(&self) -> CameraFacing {
        self.tracker.camera_facing()
    }

    pub fn device_orientation(&self) -> DeviceOrientation {
        self.tracker.device_orientation()
    }

    pub fn detection_config(&self) -> DetectionConfig {
        *self.detection_config.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merges `options` over the current configuration and reconfigures
    /// the detector. Keys left unset keep their previous value.
    pub fn update_options(&self, options: &DetectionOptions) -> Result<(), PipelineError> {
        let mut config = self.detection_config.lock().unwrap_or_else(|e| e.into_inner());
        let merged = config.merge(options);
        self.gate.configure(merged)?;
        *config = merged;
        Ok(())
    }

    pub fn update_options_json(&self, json: &str) -> Result<(), PipelineError> {
        let options = DetectionOptions::from_json(json)?;
        self.update_options(&options)
    }

    /// Starts a recording. The video track's rotation follows the device
    /// orientation at this moment.
    pub fn start_recording(&self, options: &RecordingOptions) -> StartRecordingResult {
        let dir = options
            .output_dir
            .clone()
            .or_else(|| self.output_dir.clone())
            .unwrap_or_else(default_output_dir);
        let rotation = self.tracker.current().video_rotation;

        match self.recorder.start(rotation, &dir) {
            Ok(_) => StartRecordingResult::started(),
            Err(e) => StartRecordingResult::rejected(e.to_string()),
        }
    }

    /// Requests the end of the current recording. The receiver yields the
    /// result once the file is finalized, or at once when nothing is
    /// recording.
    pub fn stop_recording(&self) -> Receiver<StopRecordingResult> {
        match self.recorder.stop() {
            StopStatus::Finalizing(result) => result,
            StopStatus::NotRecording => {
                let (tx, rx) = crossbeam_channel::bounded(1);
                let _ = tx.send(StopRecordingResult::failed(
                    RecordingError::NotRecording.to_string(),
                ));
                rx
            }
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.recorder.output_path()
    }

    pub fn on_detection(&self) -> &CallbackSlot<DetectionEvent> {
        self.gate.on_detection()
    }

    /// Receives every recording result, including recordings abandoned
    /// after a writer failure.
    pub fn on_recording_complete(&self) -> &CallbackSlot<StopRecordingResult> {
        self.recorder.on_complete()
    }

    pub fn recognize_image(&self, path: &Path) -> Result<Vec<FaceRecord>, PipelineError> {
        let frame = read_image_file(path)?;
        Ok(self.gate.recognize_still(frame)?)
    }

    pub fn recognize_image_bytes(&self, bytes: &[u8]) -> Result<Vec<FaceRecord>, PipelineError> {
        let frame = read_image_bytes(bytes)?;
        Ok(self.gate.recognize_still(frame)?)
    }

    /// Blocks until the active camera has delivered its last buffer and the
    /// capture queue has routed it.
    pub fn wait_for_capture(&self) -> Result<(), PipelineError> {
        self.capture.wait_for_source()?;
        Ok(())
    }

    /// Stops capture, then the detection worker.
    pub fn shutdown(&self) {
        self.capture.shutdown();
        self.gate.shutdown();
    }
}
