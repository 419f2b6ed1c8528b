//! Task lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task, as reported in a [`Job`](super::Job) snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Task was built by its tool but has not been started.
    #[default]
    Created,
    /// Task is executing.
    Running,
    /// Task was paused by the controller and can be resumed.
    Paused,
    /// Task finished successfully.
    Done,
    /// Task finished unsuccessfully.
    Failed,
    /// Task was terminated by the controller.
    Quit,
}

impl JobStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: JobStatus) -> bool {
        use JobStatus::*;

        if target == Quit {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (Created, Running) | (Created, Failed) |
            (Running, Paused) | (Running, Done) | (Running, Failed) |
            (Paused, Running)
        )
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Quit)
    }

    /// Check if the task is still live (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Quit => "quit",
        };
        write!(f, "{s}")
    }
}
