use std::fmt;

/// Lifecycle of the single recording session.
///
/// `Idle → WriterOpen → SessionPending → SessionActive → Finishing → Idle`.
/// Every failure path returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    /// Output file and writer are being created.
    WriterOpen,
    /// Writer accepts data; waiting for the first video timestamp and the
    /// start delay to elapse.
    SessionPending,
    SessionActive,
    /// Finalization runs off the capture queue.
    Finishing,
}

impl RecordingState {
    /// True while `stop()` has something to finalize.
    pub fn is_stoppable(&self) -> bool {
        matches!(self, RecordingState::SessionPending | RecordingState::SessionActive)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::WriterOpen => "writer-open",
            RecordingState::SessionPending => "session-pending",
            RecordingState::SessionActive => "session-active",
            RecordingState::Finishing => "finishing",
        };
        f.write_str(name)
    }
}
