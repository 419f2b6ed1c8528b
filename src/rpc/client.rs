//! Typed client for a resource node's RPC endpoints.

use std::collections::BTreeMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::protocol::*;
use crate::error::TransportError;
use crate::job::{Job, TaskId};
use crate::tools::ToolInfo;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Controller-side handle to one resource node.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    base_url: String,
    auth: SecretString,
    http: reqwest::Client,
}

impl ResourceClient {
    /// Create a client for the node at `base_url` (e.g., `http://10.0.0.5:9443`).
    pub fn new(base_url: impl Into<String>, auth: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: SecretString::from(auth.into()),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn hardware(&self) -> Result<BTreeMap<String, bool>, TransportError> {
        self.call(ENDPOINT_RESOURCE_HARDWARE, Job::default()).await
    }

    pub async fn tools(&self) -> Result<Vec<ToolInfo>, TransportError> {
        self.call(ENDPOINT_RESOURCE_TOOLS, Job::default()).await
    }

    pub async fn add_task(&self, job: Job) -> Result<Job, TransportError> {
        self.call(ENDPOINT_ADD_TASK, job).await
    }

    pub async fn task_status(&self, id: &TaskId) -> Result<Job, TransportError> {
        self.call(ENDPOINT_TASK_STATUS, Job::reference(id.clone())).await
    }

    pub async fn task_pause(&self, id: &TaskId) -> Result<Job, TransportError> {
        self.call(ENDPOINT_TASK_PAUSE, Job::reference(id.clone())).await
    }

    pub async fn task_run(&self, id: &TaskId) -> Result<Job, TransportError> {
        self.call(ENDPOINT_TASK_RUN, Job::reference(id.clone())).await
    }

    pub async fn task_quit(&self, id: &TaskId) -> Result<Job, TransportError> {
        self.call(ENDPOINT_TASK_QUIT, Job::reference(id.clone())).await
    }

    pub async fn all_task_status(&self) -> Result<Vec<Job>, TransportError> {
        self.call(ENDPOINT_ALL_TASK_STATUS, Job::default()).await
    }

    /// Whether the node answers its health probe.
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}{}", self.base_url, ENDPOINT_HEALTH);
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Health probe failed");
                false
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &str, job: Job) -> Result<T, TransportError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let body = RpcCall::new(self.auth.expose_secret(), job);

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let operation = endpoint.rsplit('/').next().unwrap_or(endpoint).to_string();
        let text = response.text().await.unwrap_or_default();
        let err = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => TransportError::Remote {
                operation,
                status: status.as_u16(),
                kind: body.error,
                message: body.message,
                job: body.job.map(Box::new),
            },
            Err(_) => TransportError::Remote {
                operation,
                status: status.as_u16(),
                kind: "transport".to_string(),
                message: text,
                job: None,
            },
        };
        tracing::debug!(url = %url, error = %err, "Resource call failed");
        Err(err)
    }
}
