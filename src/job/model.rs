//! The `Job` transfer record exchanged with the controller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobStatus;

/// Caller-assigned task identifier.
///
/// The controller allocates these and guarantees global uniqueness; the
/// resource never generates one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A description of a task to create, and a snapshot of a task's state.
///
/// Per-task calls only need `uuid`; everything else defaults so the
/// controller can send a bare identifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    /// Task identifier assigned by the controller.
    pub uuid: TaskId,
    /// Identifier of the registered tool that runs this task.
    pub tool_uuid: String,
    /// Human-readable job name.
    pub name: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Tool-specific parameters.
    pub parameters: BTreeMap<String, String>,
    /// Failure message when `status` is `failed`.
    pub error: Option<String>,
    /// Completion percentage, 0 to 100.
    pub progress: f64,
    /// When the task first started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Captured output lines.
    pub output: Vec<String>,
    /// Tool-reported performance metrics.
    pub performance: BTreeMap<String, String>,
}

impl Job {
    /// Create a job request for a tool.
    pub fn new(uuid: impl Into<TaskId>, tool_uuid: Uuid) -> Self {
        Self {
            uuid: uuid.into(),
            tool_uuid: tool_uuid.to_string(),
            ..Self::default()
        }
    }

    /// A bare reference to an existing task, for per-task calls.
    pub fn reference(uuid: impl Into<TaskId>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Record a status change, stamping start and finish times.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        match status {
            JobStatus::Running if self.started_at.is_none() => {
                self.started_at = Some(Utc::now());
            }
            s if s.is_terminal() && self.finished_at.is_none() => {
                self.finished_at = Some(Utc::now());
            }
            _ => {}
        }
    }
}
