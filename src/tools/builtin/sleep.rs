//! Sleep tool: a simulated workload that occupies wall-clock time.
//!
//! Useful for exercising the full lifecycle (including pause/resume) on a
//! node without any real compute engine installed.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::TaskError;
use crate::job::{Job, JobStatus};
use crate::tools::tool::{Task, Tool, require_param};

/// Upper bound on a single sleep task (one day).
const MAX_DURATION_SECS: f64 = 86_400.0;

/// Simulated workload tool.
#[derive(Debug)]
pub struct SleepTool {
    requirement: String,
}

impl SleepTool {
    pub fn new() -> Self {
        Self {
            requirement: "cpu".to_string(),
        }
    }

    /// Advertise a different hardware tag (e.g., "gpu") for placement tests.
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = requirement.into();
        self
    }
}

impl Default for SleepTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn kind(&self) -> &str {
        "simulation"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "duration_secs": {
                    "type": "number",
                    "description": "How long the task runs before completing"
                }
            },
            "required": ["duration_secs"]
        })
    }

    fn requirements(&self) -> &str {
        &self.requirement
    }

    fn new_task(&self, job: Job) -> Result<Box<dyn Task>, TaskError> {
        let raw = require_param(&job, "duration_secs")?;
        let secs: f64 = raw.trim().parse().map_err(|_| {
            TaskError::InvalidParameters(format!("duration_secs is not a number: {}", raw))
        })?;
        if !secs.is_finite() || secs < 0.0 || secs > MAX_DURATION_SECS {
            return Err(TaskError::InvalidParameters(format!(
                "duration_secs must be between 0 and {}",
                MAX_DURATION_SECS
            )));
        }
        Ok(Box::new(SleepTask::new(job, Duration::from_secs_f64(secs))))
    }
}

/// Task that completes after accumulating `duration` of running time.
pub struct SleepTask {
    job: Job,
    duration: Duration,
    /// Running time accumulated before the current run segment.
    banked: Duration,
    /// Start of the current run segment, if running.
    resumed_at: Option<Instant>,
}

impl SleepTask {
    fn new(mut job: Job, duration: Duration) -> Self {
        job.set_status(JobStatus::Created);
        job.performance
            .insert("duration_secs".to_string(), duration.as_secs_f64().to_string());
        Self {
            job,
            duration,
            banked: Duration::ZERO,
            resumed_at: None,
        }
    }

    fn elapsed(&self) -> Duration {
        self.banked + self.resumed_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    fn refresh(&mut self) {
        let elapsed = self.elapsed().min(self.duration);
        if !self.job.status.is_terminal() {
            self.job.progress = if self.duration.is_zero() {
                if self.job.status == JobStatus::Running { 100.0 } else { 0.0 }
            } else {
                elapsed.as_secs_f64() / self.duration.as_secs_f64() * 100.0
            };
        }
        if self.job.status == JobStatus::Running && elapsed >= self.duration {
            self.banked = self.duration;
            self.resumed_at = None;
            self.job.progress = 100.0;
            self.job.set_status(JobStatus::Done);
        }
        self.job.performance.insert(
            "elapsed_secs".to_string(),
            format!("{:.3}", elapsed.as_secs_f64()),
        );
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), TaskError> {
        let from = self.job.status;
        if !from.can_transition_to(to) {
            return Err(TaskError::InvalidTransition { from, to });
        }
        self.job.set_status(to);
        Ok(())
    }
}

#[async_trait]
impl Task for SleepTask {
    async fn run(&mut self) -> Result<(), TaskError> {
        self.refresh();
        if self.job.status == JobStatus::Running {
            return Ok(());
        }
        self.transition(JobStatus::Running)?;
        self.resumed_at = Some(Instant::now());
        self.refresh();
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TaskError> {
        self.refresh();
        self.transition(JobStatus::Paused)?;
        self.banked = self.elapsed();
        self.resumed_at = None;
        Ok(())
    }

    async fn quit(&mut self) -> Job {
        self.refresh();
        self.banked = self.elapsed();
        self.resumed_at = None;
        if self.job.status.is_active() {
            self.job.set_status(JobStatus::Quit);
        }
        self.job.clone()
    }

    async fn status(&mut self) -> Job {
        self.refresh();
        self.job.clone()
    }
}
