//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default listen address for the RPC server.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9443";

/// Built-in tools registered when `RESOURCE_TOOLS` is unset.
pub const DEFAULT_TOOLS: &[&str] = &["command", "sleep"];

/// Settings the queue needs at construction.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Shared secret every control call must present.
    pub auth_token: SecretString,
}

impl QueueConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: SecretString::from(auth_token.into()),
        }
    }
}

/// Whole-node configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub queue: QueueConfig,
    /// Address the RPC server listens on.
    pub bind_addr: SocketAddr,
    /// Working directory for `command` tasks (None = process cwd).
    pub work_dir: Option<PathBuf>,
    /// Names of built-in tools to register.
    pub tools: Vec<String>,
    /// Hardware tag advertised by the `sleep` tool.
    pub sleep_requirement: String,
    /// Directory for rolling log files (None = stderr only).
    pub log_dir: Option<PathBuf>,
}

impl NodeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("RESOURCE_AUTH_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("RESOURCE_AUTH_TOKEN".to_string()))?;

        let bind_raw = lookup("RESOURCE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "RESOURCE_BIND_ADDR".to_string(),
                message: format!("{}: {}", bind_raw, e),
            })?;

        let work_dir = lookup("RESOURCE_WORK_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        if let Some(dir) = &work_dir
            && !dir.is_dir()
        {
            return Err(ConfigError::InvalidValue {
                key: "RESOURCE_WORK_DIR".to_string(),
                message: format!("{} is not a directory", dir.display()),
            });
        }

        let tools: Vec<String> = match lookup("RESOURCE_TOOLS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_TOOLS.iter().map(|s| s.to_string()).collect(),
        };
        if let Some(unknown) = tools.iter().find(|t| !DEFAULT_TOOLS.contains(&t.as_str())) {
            return Err(ConfigError::InvalidValue {
                key: "RESOURCE_TOOLS".to_string(),
                message: format!("unknown tool '{}'", unknown),
            });
        }
        if tools.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "RESOURCE_TOOLS".to_string(),
                hint: format!("Register at least one of: {}", DEFAULT_TOOLS.join(", ")),
            });
        }

        let sleep_requirement = lookup("RESOURCE_SLEEP_REQUIREMENT")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "cpu".to_string());

        let log_dir = lookup("RESOURCE_LOG_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            queue: QueueConfig::new(token),
            bind_addr,
            work_dir,
            tools,
            sleep_requirement,
            log_dir,
        })
    }
}
