//! Queue — the task lifecycle manager.
//!
//! Owns the task store and the (read-only) tool registry. Every control
//! operation checks the caller's token first, then resolves the task or tool
//! and delegates the lifecycle step while holding the task's lease.

use std::collections::BTreeMap;

use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::job::{Job, TaskId};
use crate::queue::store::{SlotLease, TaskStore};
use crate::tools::{ToolInfo, ToolRegistry};

/// Task lifecycle manager for one resource node.
pub struct Queue {
    auth_token: SecretString,
    tools: ToolRegistry,
    store: TaskStore,
}

impl Queue {
    /// Create a queue over an already-populated registry.
    pub fn new(config: QueueConfig, tools: ToolRegistry) -> Self {
        Self {
            auth_token: config.auth_token,
            tools,
            store: TaskStore::new(),
        }
    }

    fn authenticate(&self, auth: &str, operation: &str) -> Result<(), QueueError> {
        if auth != self.auth_token.expose_secret() {
            warn!(operation, "Rejected call with bad authentication token");
            return Err(QueueError::Unauthorized);
        }
        Ok(())
    }

    async fn lease(&self, id: &TaskId) -> Result<SlotLease, QueueError> {
        self.store
            .lease(id)
            .await
            .ok_or_else(|| QueueError::NoSuchTask { id: id.clone() })
    }

    /// The node's hardware capability set.
    pub async fn resource_hardware(&self, auth: &str) -> Result<BTreeMap<String, bool>, QueueError> {
        self.authenticate(auth, "ResourceHardware")?;
        Ok(self.tools.hardware().clone())
    }

    /// Metadata for every registered tool.
    pub async fn resource_tools(&self, auth: &str) -> Result<Vec<ToolInfo>, QueueError> {
        self.authenticate(auth, "ResourceTools")?;
        Ok(self.tools.list())
    }

    /// Create a task for `job` on its tool, start it, and return its status.
    pub async fn add_task(&self, auth: &str, job: Job) -> Result<Job, QueueError> {
        self.authenticate(auth, "AddTask")?;

        let id = job.uuid.clone();
        if id.is_empty() {
            return Err(QueueError::InvalidRequest(
                "job is missing a task uuid".to_string(),
            ));
        }

        let registered = self
            .tools
            .lookup(&job.tool_uuid)
            .ok_or_else(|| QueueError::NoSuchTool {
                id: job.tool_uuid.clone(),
            })?;

        // Cheap pre-check so a duplicate never reaches the tool factory.
        if self.store.contains(&id).await {
            return Err(QueueError::TaskExists { id });
        }

        let task = registered
            .tool
            .new_task(job)
            .map_err(|source| QueueError::Factory {
                tool: registered.tool.name().to_string(),
                source,
            })?;

        let mut lease = match self.store.insert_leased(id.clone(), task).await {
            Ok(lease) => lease,
            Err(mut orphan) => {
                // Lost a race with another AddTask for the same id.
                orphan.quit().await;
                return Err(QueueError::TaskExists { id });
            }
        };

        if let Err(source) = lease.task().run().await {
            let last = lease.task().quit().await;
            self.store.retire(lease).await;
            warn!(
                task_id = %id,
                tool = %registered.tool.name(),
                error = %source,
                final_status = %last.status,
                "Task failed to start and was removed"
            );
            return Err(QueueError::Start { id, source });
        }

        let status = lease.task().status().await;
        info!(
            task_id = %id,
            tool = %registered.tool.name(),
            tool_id = %registered.id,
            status = %status.status,
            "Task added and started"
        );
        Ok(status)
    }

    /// Current status of one task.
    pub async fn task_status(&self, auth: &str, id: &TaskId) -> Result<Job, QueueError> {
        self.authenticate(auth, "TaskStatus")?;
        let mut lease = self.lease(id).await?;
        Ok(lease.task().status().await)
    }

    /// Pause a task. A task that fails to pause is terminated and removed.
    pub async fn task_pause(&self, auth: &str, id: &TaskId) -> Result<Job, QueueError> {
        self.authenticate(auth, "TaskPause")?;
        let mut lease = self.lease(id).await?;

        if let Err(source) = lease.task().pause().await {
            let last = lease.task().quit().await;
            self.store.retire(lease).await;
            warn!(
                task_id = %id,
                error = %source,
                final_status = %last.status,
                "Task failed to pause and was terminated"
            );
            return Err(QueueError::Pause {
                id: id.clone(),
                source,
                final_status: Box::new(last),
            });
        }

        let status = lease.task().status().await;
        info!(task_id = %id, status = %status.status, "Task paused");
        Ok(status)
    }

    /// Start or resume a task.
    pub async fn task_run(&self, auth: &str, id: &TaskId) -> Result<Job, QueueError> {
        self.authenticate(auth, "TaskRun")?;
        let mut lease = self.lease(id).await?;

        lease
            .task()
            .run()
            .await
            .map_err(|source| QueueError::Run {
                id: id.clone(),
                source,
            })?;

        let status = lease.task().status().await;
        info!(task_id = %id, status = %status.status, "Task running");
        Ok(status)
    }

    /// Terminate a task, remove it, and return its final status.
    pub async fn task_quit(&self, auth: &str, id: &TaskId) -> Result<Job, QueueError> {
        self.authenticate(auth, "TaskQuit")?;
        let mut lease = self.lease(id).await?;

        let last = lease.task().quit().await;
        self.store.retire(lease).await;
        info!(task_id = %id, status = %last.status, "Task quit and removed");
        Ok(last)
    }

    /// Status of every task in the store, in unspecified order.
    pub async fn all_task_status(&self, auth: &str) -> Result<Vec<Job>, QueueError> {
        self.authenticate(auth, "AllTaskStatus")?;
        let ids = self.store.ids().await;

        // Each future holds at most one lease at a time.
        let jobs = join_all(ids.iter().map(|id| async move {
            let mut lease = self.store.lease(id).await?;
            Some(lease.task().status().await)
        }))
        .await;

        Ok(jobs.into_iter().flatten().collect())
    }

    /// Number of live tasks.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    /// Identifiers of live tasks.
    pub async fn task_ids(&self) -> Vec<TaskId> {
        self.store.ids().await
    }

    /// Terminate and remove every task. Used when the node shuts down.
    pub async fn shutdown(&self) -> Vec<Job> {
        let mut finals = Vec::new();
        for id in self.store.ids().await {
            if let Some(mut lease) = self.store.lease(&id).await {
                let last = lease.task().quit().await;
                self.store.retire(lease).await;
                debug!(task_id = %id, status = %last.status, "Task terminated on shutdown");
                finals.push(last);
            }
        }
        info!(count = finals.len(), "All tasks terminated");
        finals
    }
}
