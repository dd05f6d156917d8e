use std::fmt;

/// Lifecycle of one capture worker.
///
/// ```text
/// Idle ──► Running ──► Stopping ──► Stopped
///   │         │                        ▲
///   │         ├────────────────────────┤   (end of stream)
///   │         └──► Failed              │
///   ├──► Failed                        │
///   └──────────────────────────────────┘   (stop before open)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
    Stopped,
    Failed(String),
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Stopped | WorkerState::Failed(_))
    }

    pub fn can_transition_to(&self, next: &WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Idle, Failed(_))
                | (Idle, Stopped)
                | (Running, Stopping)
                | (Running, Stopped)
                | (Running, Failed(_))
                | (Stopping, Stopped)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Idle => f.write_str("idle"),
            WorkerState::Running => f.write_str("running"),
            WorkerState::Stopping => f.write_str("stopping"),
            WorkerState::Stopped => f.write_str("stopped"),
            WorkerState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
