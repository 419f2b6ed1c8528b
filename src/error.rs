//! Error types for the resource node.

use crate::job::{Job, JobStatus, TaskId};

/// Errors that stop the node itself (startup and serving).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures raised by a tool or one of its tasks.
///
/// These travel back to the controller verbatim, wrapped in a [`QueueError`]
/// that names the lifecycle step which failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to spawn task process: {0}")]
    Spawn(String),

    #[error("Operation '{operation}' is not supported by this tool")]
    Unsupported { operation: String },

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Errors returned by the queue's control operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Call to resource did not have the proper authentication token")]
    Unauthorized,

    #[error("Tool {id} does not exist")]
    NoSuchTool { id: String },

    #[error("Task {id} does not exist")]
    NoSuchTask { id: TaskId },

    #[error("Task {id} already exists")]
    TaskExists { id: TaskId },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Tool {tool} could not create task: {source}")]
    Factory {
        tool: String,
        #[source]
        source: TaskError,
    },

    #[error("Error starting task {id} on the resource: {source}")]
    Start {
        id: TaskId,
        #[source]
        source: TaskError,
    },

    #[error("Task {id} failed to pause and was terminated: {source}")]
    Pause {
        id: TaskId,
        #[source]
        source: TaskError,
        final_status: Box<Job>,
    },

    #[error("Task {id} failed to run: {source}")]
    Run {
        id: TaskId,
        #[source]
        source: TaskError,
    },
}

impl QueueError {
    /// Stable machine-readable name of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "authentication",
            Self::NoSuchTool { .. } => "no_such_tool",
            Self::NoSuchTask { .. } => "no_such_task",
            Self::TaskExists { .. } => "task_exists",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Factory { .. } => "factory",
            Self::Start { .. } => "start",
            Self::Pause { .. } => "pause",
            Self::Run { .. } => "run",
        }
    }
}

/// Client-side transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resource rejected {operation} ({status}): [{kind}] {message}")]
    Remote {
        operation: String,
        status: u16,
        kind: String,
        message: String,
        job: Option<Box<Job>>,
    },
}

impl TransportError {
    /// The wire error kind, if the resource answered with an error body.
    pub fn remote_kind(&self) -> Option<&str> {
        match self {
            Self::Remote { kind, .. } => Some(kind),
            Self::Http(_) => None,
        }
    }
}

/// Result type alias for the node.
pub type Result<T> = std::result::Result<T, Error>;
