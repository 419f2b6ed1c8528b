//! Node bootstrap: tool registry from configuration, listener, serve, drain.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::NodeConfig;
use crate::error::{ConfigError, Result};
use crate::job::Job;
use crate::queue::Queue;
use crate::rpc;
use crate::tools::ToolRegistry;
use crate::tools::builtin::{CommandTool, SleepTool};

/// Register the configured built-in tools.
pub fn build_registry(config: &NodeConfig) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for name in &config.tools {
        let id = match name.as_str() {
            "command" => {
                let mut tool = CommandTool::new();
                if let Some(dir) = &config.work_dir {
                    tool = tool.with_working_dir(dir.clone());
                }
                registry.register(Arc::new(tool))
            }
            "sleep" => registry.register(Arc::new(
                SleepTool::new().with_requirement(config.sleep_requirement.clone()),
            )),
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "RESOURCE_TOOLS".to_string(),
                    message: format!("unknown tool '{}'", other),
                }
                .into());
            }
        };
        info!(tool = %name, tool_id = %id, "Registered tool");
    }
    Ok(registry)
}

/// Serve the queue on the configured address until `shutdown` resolves,
/// then terminate every live task and return their final snapshots.
pub async fn run<F>(config: NodeConfig, shutdown: F) -> Result<Vec<Job>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = build_registry(&config)?;
    let hardware: Vec<&str> = registry.hardware().keys().map(String::as_str).collect();
    info!(
        tools = registry.count(),
        hardware = %hardware.join(","),
        "Tool registry ready"
    );

    let queue = Arc::new(Queue::new(config.queue.clone(), registry));
    let listener = TcpListener::bind(config.bind_addr).await?;
    rpc::serve(listener, Arc::clone(&queue), shutdown).await?;

    let finals = queue.shutdown().await;
    info!(terminated = finals.len(), "Resource node stopped");
    Ok(finals)
}
