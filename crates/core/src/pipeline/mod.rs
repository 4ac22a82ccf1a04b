pub mod camera_pipeline;
pub mod capture_session;
pub mod detection_gate;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod recording_controller;

#[cfg(test)]
mod test_support;
