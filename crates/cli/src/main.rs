use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facecam_core::capture::infrastructure::file_replay_camera::{
    FileReplayCameraProvider, ReplayOptions,
};
use facecam_core::detection::domain::detection_config::DetectionOptions;
use facecam_core::detection::domain::face_detector::FaceDetector;
use facecam_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use facecam_core::orientation::domain::device_orientation::{CameraFacing, DeviceOrientation};
use facecam_core::pipeline::camera_pipeline::CameraPipeline;
use facecam_core::pipeline::pipeline_logger::LogPipelineLogger;
use facecam_core::recording::domain::recording_result::RecordingOptions;
use facecam_core::recording::infrastructure::ffmpeg_container_writer::FfmpegContainerWriterFactory;
use facecam_core::shared::settings::Settings;

const PROGRESS_EVERY_FRAMES: u64 = 30;

/// Replays media files as a live camera, records them and prints face
/// detection events as JSON lines.
#[derive(Parser)]
#[command(name = "facecam")]
struct Cli {
    /// Media file served as the back camera and microphone.
    #[arg(long)]
    back: Option<PathBuf>,

    /// Media file served as the front camera and microphone.
    #[arg(long)]
    front: Option<PathBuf>,

    /// Camera to capture from (defaults to the saved setting).
    #[arg(long)]
    facing: Option<CameraFacing>,

    /// Device orientation: portrait, portraitUpsideDown, landscapeLeft,
    /// landscapeRight, faceUp, faceDown, unknown.
    #[arg(long, default_value = "portrait")]
    orientation: DeviceOrientation,

    /// Stop after this many seconds of media.
    #[arg(long)]
    record_secs: Option<f64>,

    /// Directory for the recording (defaults to the documents directory).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Detection options as JSON, e.g. '{"minFaceSize": 0.3}'.
    #[arg(long)]
    options: Option<String>,

    /// Pre-computed face records per frame index (JSON file).
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Deliver buffers at capture speed instead of as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// Recognize faces in a still image instead of recording.
    #[arg(long)]
    still: Option<PathBuf>,

    /// Persist the camera, output directory and detection options given
    /// here as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut settings = overlay_flags(&cli, Settings::load());

    let pipeline = build_pipeline(&cli, &settings)?;
    match &cli.options {
        Some(json) => pipeline.update_options_json(json)?,
        None => pipeline.update_options(&DetectionOptions::default())?,
    }
    if cli.save_settings {
        settings.detection = pipeline.detection_config();
        settings.save()?;
        log::info!("settings saved");
    }

    let result = match &cli.still {
        Some(image) => run_still(&pipeline, image),
        None => run_recording(&pipeline, &cli, settings.camera_facing),
    };
    pipeline.shutdown();
    result
}

fn overlay_flags(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(facing) = cli.facing {
        settings.camera_facing = facing;
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
    }
    settings
}

fn validate(cli: &Cli) -> Result<(), String> {
    if cli.still.is_none() && cli.back.is_none() && cli.front.is_none() {
        return Err("provide --back and/or --front media, or --still <image>".into());
    }
    if let Some(secs) = cli.record_secs {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(format!("--record-secs must be positive, got {secs}"));
        }
    }
    Ok(())
}

fn build_pipeline(
    cli: &Cli,
    settings: &Settings,
) -> Result<CameraPipeline, Box<dyn std::error::Error>> {
    let replay = ReplayOptions {
        realtime: cli.realtime,
        max_duration: cli.record_secs.map(Duration::from_secs_f64),
        sample_rate: settings.audio_sample_rate,
    };
    let mut provider = FileReplayCameraProvider::new(replay);
    if let Some(path) = &cli.back {
        provider = provider.with_camera(CameraFacing::Back, path);
    }
    if let Some(path) = &cli.front {
        provider = provider.with_camera(CameraFacing::Front, path);
    }

    Ok(CameraPipeline::new(
        Arc::new(provider),
        build_detector(cli.detections.as_deref())?,
        Arc::new(FfmpegContainerWriterFactory),
        settings,
        LogPipelineLogger::shared(PROGRESS_EVERY_FRAMES),
    ))
}

fn build_detector(detections: Option<&Path>) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let detector = match detections {
        Some(path) => ReplayFaceDetector::from_file(path)?,
        None => {
            log::info!("no --detections given; every analyzed frame reports no faces");
            ReplayFaceDetector::new(Arc::default())
        }
    };
    Ok(Box::new(detector))
}

fn run_still(pipeline: &CameraPipeline, image: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let faces = pipeline.recognize_image(image)?;
    println!("{}", serde_json::to_string(&faces)?);
    Ok(())
}

fn run_recording(
    pipeline: &CameraPipeline,
    cli: &Cli,
    facing: CameraFacing,
) -> Result<(), Box<dyn std::error::Error>> {
    pipeline.on_detection().set(Box::new(|event| {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("could not serialize detection event: {e}"),
        }
    }));
    pipeline.set_device_orientation(cli.orientation);

    // the writer is open before the camera so the first frames are recorded
    let started = pipeline.start_recording(&RecordingOptions {
        output_dir: cli.output_dir.clone(),
    });
    if !started.started {
        return Err(started.error.unwrap_or_else(|| "recording did not start".into()).into());
    }

    if let Err(e) = pipeline.set_camera_facing(facing) {
        let _ = pipeline.stop_recording().recv();
        return Err(e.into());
    }
    pipeline.wait_for_capture()?;
    pipeline.on_detection().clear();

    let result = pipeline.stop_recording().recv()?;
    println!("{}", serde_json::to_string(&result)?);
    match result.error_message {
        Some(message) if result.has_error => Err(message.into()),
        _ => {
            if let Some(path) = &result.path {
                log::info!("Recording written to {path}");
            }
            Ok(())
        }
    }
}
