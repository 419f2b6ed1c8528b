//! Capability contracts for tools and the tasks they create.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;
use crate::job::Job;

/// An execution capability the resource advertises to the controller.
///
/// A tool is static metadata plus a factory. Its identifier is not part of
/// the tool itself; the [`ToolRegistry`](super::ToolRegistry) assigns one
/// at registration.
pub trait Tool: Send + Sync {
    /// Tool name (e.g., "command").
    fn name(&self) -> &str;

    /// Tool family, free-form (e.g., "shell", "simulation").
    fn kind(&self) -> &str;

    /// Tool version string.
    fn version(&self) -> &str;

    /// JSON Schema describing the parameters a job must carry.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Hardware requirement tag (e.g., "cpu", "gpu").
    fn requirements(&self) -> &str;

    /// Build a task for a job. The task is not started.
    fn new_task(&self, job: Job) -> Result<Box<dyn Task>, TaskError>;
}

/// A live unit of execution created by a [`Tool`].
///
/// The queue serializes every call on one task, so implementations take
/// `&mut self` and never see concurrent lifecycle commands. Lifecycle calls
/// must return promptly: the queue holds the task's lock across them.
#[async_trait]
pub trait Task: Send {
    /// Start the task, or resume it if paused.
    async fn run(&mut self) -> Result<(), TaskError>;

    /// Pause the task.
    async fn pause(&mut self) -> Result<(), TaskError>;

    /// Terminate the task and collect its final state.
    ///
    /// Must be safe from any reachable state, including straight after
    /// creation and after a failed `run`.
    async fn quit(&mut self) -> Job;

    /// Snapshot the task's current state.
    async fn status(&mut self) -> Job;
}

/// Serializable snapshot of a registered tool's static fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub version: String,
    pub parameters: serde_json::Value,
    pub requirements: String,
}

impl ToolInfo {
    pub fn from_tool(id: Uuid, tool: &dyn Tool) -> Self {
        Self {
            id,
            name: tool.name().to_string(),
            kind: tool.kind().to_string(),
            version: tool.version().to_string(),
            parameters: tool.parameters_schema(),
            requirements: tool.requirements().to_string(),
        }
    }
}

/// Extract a required, non-empty string parameter from a job.
pub fn require_param<'a>(job: &'a Job, name: &str) -> Result<&'a str, TaskError> {
    match job.parameter(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TaskError::InvalidParameters(format!(
            "missing '{}' parameter",
            name
        ))),
    }
}
