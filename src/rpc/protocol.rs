//! Wire contract between the controller and a resource node.
//!
//! Every operation is a `POST` of an [`RpcCall`] envelope to its endpoint.
//! Successful calls answer with the operation's result as JSON; failures
//! answer with an [`ErrorBody`].

use serde::{Deserialize, Serialize};

use crate::job::Job;

pub const ENDPOINT_HEALTH: &str = "/health";
pub const ENDPOINT_RESOURCE_HARDWARE: &str = "/rpc/ResourceHardware";
pub const ENDPOINT_RESOURCE_TOOLS: &str = "/rpc/ResourceTools";
pub const ENDPOINT_ADD_TASK: &str = "/rpc/AddTask";
pub const ENDPOINT_TASK_STATUS: &str = "/rpc/TaskStatus";
pub const ENDPOINT_TASK_PAUSE: &str = "/rpc/TaskPause";
pub const ENDPOINT_TASK_RUN: &str = "/rpc/TaskRun";
pub const ENDPOINT_TASK_QUIT: &str = "/rpc/TaskQuit";
pub const ENDPOINT_ALL_TASK_STATUS: &str = "/rpc/AllTaskStatus";

/// Authenticated request envelope.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcCall {
    pub auth: String,
    pub job: Job,
}

impl RpcCall {
    pub fn new(auth: impl Into<String>, job: Job) -> Self {
        Self {
            auth: auth.into(),
            job,
        }
    }
}

impl std::fmt::Debug for RpcCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcCall")
            .field("auth", &"[REDACTED]")
            .field("job", &self.job)
            .finish()
    }
}

/// Error payload returned with any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind (e.g., "no_such_task").
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Final task snapshot, when the failure terminated a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}
