use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Named event counters kept by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineCounter {
    VideoReceived,
    AudioReceived,
    VideoAppended,
    AudioAppended,
    DetectionDropped,
    DetectionEvents,
}

impl PipelineCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineCounter::VideoReceived => "video_received",
            PipelineCounter::AudioReceived => "audio_received",
            PipelineCounter::VideoAppended => "video_appended",
            PipelineCounter::AudioAppended => "audio_appended",
            PipelineCounter::DetectionDropped => "detection_dropped",
            PipelineCounter::DetectionEvents => "detection_events",
        }
    }
}

impl fmt::Display for PipelineCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Cross-cutting logger for pipeline events.
///
/// The capture queue and the detection worker both report into it, so
/// callers can observe throughput without the orchestration code knowing
/// where the numbers go.
pub trait PipelineLogger: Send {
    fn count(&mut self, counter: PipelineCounter);

    /// Record how long a named stage took for one buffer.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

pub type SharedPipelineLogger = Arc<Mutex<dyn PipelineLogger>>;

/// Runs `f` against the shared logger, tolerating a poisoned lock.
pub(crate) fn with_logger(logger: &SharedPipelineLogger, f: impl FnOnce(&mut dyn PipelineLogger)) {
    let mut guard = logger.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut *guard);
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl NullPipelineLogger {
    pub fn shared() -> SharedPipelineLogger {
        Arc::new(Mutex::new(NullPipelineLogger))
    }
}

impl PipelineLogger for NullPipelineLogger {
    fn count(&mut self, _counter: PipelineCounter) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger backed by the `log` crate that keeps counters and per-stage
/// timings, reporting progress every `throttle_frames` video frames.
pub struct LogPipelineLogger {
    throttle_frames: u64,
    counters: HashMap<PipelineCounter, u64>,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            counters: HashMap::new(),
            timings: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn shared(throttle_frames: u64) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(throttle_frames)))
    }

    pub fn counter(&self, counter: PipelineCounter) -> u64 {
        self.counters.get(&counter).copied().unwrap_or(0)
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.counters.is_empty() && self.timings.is_empty() {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let frames = self.counter(PipelineCounter::VideoReceived);
        let mut lines = vec![format!(
            "Pipeline summary ({frames} frames, {elapsed:.1}s total):"
        )];

        let mut counters: Vec<_> = self.counters.iter().collect();
        counters.sort();
        for (counter, value) in counters {
            lines.push(format!("  {counter:18}: {value}"));
        }

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:18}: avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let analyzed = self.counter(PipelineCounter::DetectionEvents);
        if frames > 0 {
            let pct = analyzed as f64 / frames as f64 * 100.0;
            lines.push(format!("  Analyzed: {analyzed}/{frames} frames ({pct:.1}%)"));
        }
        if frames > 0 && elapsed > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", frames as f64 / elapsed));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn count(&mut self, counter: PipelineCounter) {
        let value = self.counters.entry(counter).or_default();
        *value += 1;
        if counter == PipelineCounter::VideoReceived && *value % self.throttle_frames == 0 {
            let value = *value;
            log::info!(
                "Capture: {value} frames, {} recorded, {} analyzed",
                self.counter(PipelineCounter::VideoAppended),
                self.counter(PipelineCounter::DetectionEvents)
            );
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
