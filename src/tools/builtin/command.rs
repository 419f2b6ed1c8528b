//! Command tool: runs a shell command line as a subprocess.
//!
//! Provides:
//! - Working directory isolation
//! - Output capture (stdout and stderr, line by line, capped)
//! - Blocked command patterns for safety
//!
//! The subprocess cannot be suspended, so `pause` is unsupported and the
//! queue retires the task when a controller asks for it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::TaskError;
use crate::job::{Job, JobStatus};
use crate::tools::tool::{Task, Tool, require_param};

/// Maximum number of captured output lines kept per task.
const MAX_OUTPUT_LINES: usize = 1000;

/// Longer lines are truncated when captured.
const MAX_LINE_BYTES: usize = 4096;

/// How long `quit` waits for output readers to drain after the kill.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Command fragments that are always blocked for safety.
static BLOCKED_PATTERNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "rm -rf /",
        "rm -rf /*",
        ":(){ :|:& };:", // Fork bomb
        "dd if=/dev/zero",
        "chmod -r 777 /",
        "> /dev/sda",
    ])
});

/// Programs that may not be invoked, matched against each command word.
static BLOCKED_PROGRAMS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| HashSet::from(["shutdown", "reboot", "halt", "poweroff", "mkfs"]));

/// Shell command tool.
#[derive(Debug)]
pub struct CommandTool {
    /// Working directory for commands (if None, uses cwd).
    working_dir: Option<PathBuf>,
}

impl CommandTool {
    /// Create a new command tool with default settings.
    pub fn new() -> Self {
        Self { working_dir: None }
    }

    /// Set the working directory.
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Check if a command is blocked.
    ///
    /// Fragments match anywhere in the whitespace-normalized command. Program
    /// names match whole words only, by basename, so `/sbin/reboot` and
    /// `mkfs.ext4` are caught but `echo shutdown_report` is not.
    fn is_blocked(cmd: &str) -> bool {
        let normalized = cmd
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if BLOCKED_PATTERNS
            .iter()
            .any(|pattern| contains_fragment(&normalized, pattern))
        {
            return true;
        }

        normalized
            .split(|c: char| c.is_whitespace() || matches!(c, ';' | '|' | '&' | '(' | ')' | '`'))
            .filter(|word| !word.is_empty())
            .any(|word| {
                let program = word.rsplit('/').next().unwrap_or(word);
                BLOCKED_PROGRAMS.iter().any(|blocked| {
                    program == *blocked
                        || program
                            .strip_prefix(*blocked)
                            .is_some_and(|rest| rest.starts_with('.'))
                })
            })
    }
}

impl Default for CommandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CommandTool {
    fn name(&self) -> &str {
        "command"
    }

    fn kind(&self) -> &str {
        "shell"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command line to execute"
                },
                "workdir": {
                    "type": "string",
                    "description": "Working directory for the command (optional)"
                }
            },
            "required": ["command"]
        })
    }

    fn requirements(&self) -> &str {
        "cpu"
    }

    fn new_task(&self, job: Job) -> Result<Box<dyn Task>, TaskError> {
        let command = require_param(&job, "command")?.to_string();
        if Self::is_blocked(&command) {
            return Err(TaskError::InvalidParameters(format!(
                "command contains blocked pattern: {}",
                command.chars().take(80).collect::<String>()
            )));
        }

        let workdir = job
            .parameter("workdir")
            .map(PathBuf::from)
            .or_else(|| self.working_dir.clone())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        Ok(Box::new(CommandTask::new(job, command, workdir)))
    }
}

/// A running (or runnable) shell command.
pub struct CommandTask {
    job: Job,
    command: String,
    workdir: PathBuf,
    child: Option<Child>,
    output: Arc<Mutex<Vec<String>>>,
    readers: Vec<JoinHandle<()>>,
}

impl CommandTask {
    fn new(mut job: Job, command: String, workdir: PathBuf) -> Self {
        job.set_status(JobStatus::Created);
        Self {
            job,
            command,
            workdir,
            child: None,
            output: Arc::new(Mutex::new(Vec::new())),
            readers: Vec::new(),
        }
    }

    fn spawn(&mut self) -> Result<(), TaskError> {
        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", self.command.as_str()]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", self.command.as_str()]);
            c
        };

        command
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| TaskError::Spawn(format!("{}: {}", self.command, e)))?;

        if let Some(stdout) = child.stdout.take() {
            self.readers.push(capture_lines(stdout, self.output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            self.readers.push(capture_lines(stderr, self.output.clone()));
        }

        if let Some(pid) = child.id() {
            self.job.performance.insert("pid".to_string(), pid.to_string());
        }
        tracing::debug!(task_id = %self.job.uuid, command = %self.command, "Spawned command");
        self.child = Some(child);
        Ok(())
    }

    /// Fold the subprocess exit state into the job status.
    fn refresh(&mut self) {
        if self.job.status != JobStatus::Running {
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(exit)) if exit.success() => {
                self.job.progress = 100.0;
                self.job.set_status(JobStatus::Done);
            }
            Ok(Some(exit)) => {
                self.job.error = Some(match exit.code() {
                    Some(code) => format!("command exited with code {}", code),
                    None => "command terminated by signal".to_string(),
                });
                self.job.set_status(JobStatus::Failed);
            }
            Ok(None) => {}
            Err(e) => {
                self.job.error = Some(format!("failed to poll command: {}", e));
                self.job.set_status(JobStatus::Failed);
            }
        }
    }

    async fn snapshot(&self) -> Job {
        let mut job = self.job.clone();
        job.output = self.output.lock().await.clone();
        job
    }
}

#[async_trait]
impl Task for CommandTask {
    async fn run(&mut self) -> Result<(), TaskError> {
        self.refresh();
        match self.job.status {
            JobStatus::Created => {
                self.spawn()?;
                self.job.set_status(JobStatus::Running);
                Ok(())
            }
            JobStatus::Running => Ok(()),
            from => Err(TaskError::InvalidTransition {
                from,
                to: JobStatus::Running,
            }),
        }
    }

    async fn pause(&mut self) -> Result<(), TaskError> {
        Err(TaskError::Unsupported {
            operation: "pause".to_string(),
        })
    }

    async fn quit(&mut self) -> Job {
        self.refresh();
        if let Some(child) = self.child.as_mut()
            && self.job.status.is_active()
            && let Err(e) = child.kill().await
        {
            tracing::warn!(task_id = %self.job.uuid, error = %e, "Failed to kill command");
        }
        for mut reader in self.readers.drain(..) {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
                // A grandchild may still hold the pipe open.
                reader.abort();
                tracing::debug!(task_id = %self.job.uuid, "Output reader aborted after drain timeout");
            }
        }
        if self.job.status.is_active() {
            self.job.set_status(JobStatus::Quit);
        }
        self.snapshot().await
    }

    async fn status(&mut self) -> Job {
        self.refresh();
        self.snapshot().await
    }
}

fn capture_lines<R>(stream: R, output: Arc<Mutex<Vec<String>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        // Reads until EOF even past the line cap, so the writer never sees
        // a closed pipe.
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let mut out = output.lock().await;
                    if out.len() < MAX_OUTPUT_LINES {
                        out.push(decode_line(&buf));
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Command output stream closed with error");
                    break;
                }
            }
        }
    })
}

/// Whether `pattern` occurs in `command`. Fragments ending in a path
/// (`rm -rf /`) only match when the path ends there, so `rm -rf /tmp/x`
/// is allowed.
fn contains_fragment(command: &str, pattern: &str) -> bool {
    if !pattern.ends_with(['/', '*']) {
        return command.contains(pattern);
    }
    command.match_indices(pattern).any(|(at, _)| {
        command[at + pattern.len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, ';' | '|' | '&'))
    })
}

/// Lossy-decode one raw output line, without its terminator, capped in length.
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    let text = String::from_utf8_lossy(&raw[..end.min(MAX_LINE_BYTES)]);
    text.into_owned()
}
