//! Long-running appliance tasks.
//!
//! OneView answers slow operations with a task document (`taskState`,
//! `taskErrors`, `associatedResource`); ICsp answers jobs with a job
//! document (`running`, `state`, `jobResult`). Both are read into [`Task`]
//! and polled by [`TaskMonitor`] until they reach a terminal state.

use crate::error::{Error, Result};
use appliance::Appliance;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::thread;
use std::time::Duration;

/// Default delay between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Success,
    Failure,
    /// Scheduled for later; nothing more will happen in this invocation.
    Pending,
}

impl TaskState {
    fn parse(state: &str) -> Option<Self> {
        let state = state.to_ascii_uppercase();
        if state.contains("SUCCESS") || state.contains("COMPLETED") || state.contains("WARNING") {
            Some(Self::Success)
        } else if ["FAIL", "ERROR", "KILLED", "TERMINATED", "INTERRUPTED", "ABORT"]
            .iter()
            .any(|word| state.contains(word))
        {
            Some(Self::Failure)
        } else if state == "STATUS_PENDING" || state.contains("SCHEDULED") {
            // OneView `Pending` only means queued and keeps polling
            Some(Self::Pending)
        } else if state.is_empty() {
            None
        } else {
            Some(Self::Running)
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// A task or job as last seen on the appliance.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub uri: Option<String>,
    pub name: String,
    pub running: bool,
    pub state: TaskState,
    /// Error and log details, joined.
    pub log: String,
    /// When a pending task will run, as reported.
    pub scheduled_time: Option<String>,
    /// Latest status line.
    pub progress: Option<String>,
    pub percent: Option<u32>,
    /// Resource the task created or modified.
    pub associated_resource: Option<String>,
    /// The raw document.
    pub raw: Value,
}

impl Task {
    /// Whether an appliance answer is a task or job rather than a resource.
    #[must_use]
    pub fn is_task(value: &Value) -> bool {
        let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default();
        text("category") == "tasks"
            || text("type").starts_with("TaskResource")
            || value.get("taskState").is_some()
            || text("uri").contains("/rest/tasks/")
            || text("uri").contains("/os-deployment-jobs/")
    }

    /// Read a task or job document.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // ICsp reports `running` as a string
        let running = match value.get("running") {
            Some(Value::Bool(flag)) => Some(*flag),
            Some(Value::String(flag)) => Some(flag.eq_ignore_ascii_case("true")),
            _ => None,
        };
        let reported = text("taskState")
            .or_else(|| text("state"))
            .and_then(|state| TaskState::parse(&state));
        let scheduled_time = text("scheduledTime").or_else(|| text("scheduledStartTime"));
        let state = match (running, reported) {
            (Some(true), _) => TaskState::Running,
            (_, Some(state)) => state,
            (Some(false), None) => TaskState::Success,
            (None, None) => TaskState::Running,
        };
        let state = match state {
            TaskState::Running if scheduled_time.is_some() => TaskState::Pending,
            state => state,
        };

        Self {
            uri: text("uri"),
            name: text("name").unwrap_or_else(|| "task".to_string()),
            running: state == TaskState::Running,
            state,
            log: task_log(value),
            scheduled_time,
            progress: text("taskStatus").or_else(|| text("status")),
            percent: value
                .get("percentComplete")
                .and_then(Value::as_u64)
                .map(|percent| percent.min(100) as u32),
            associated_resource: value
                .pointer("/associatedResource/resourceUri")
                .and_then(Value::as_str)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
            raw: value.clone(),
        }
    }

    /// One-line status for progress rendering.
    #[must_use]
    pub fn status_line(&self) -> String {
        let mut line = self.name.clone();
        if let Some(percent) = self.percent {
            line.push_str(&format!(" [{percent}%]"));
        }
        if let Some(progress) = &self.progress {
            line.push_str(": ");
            line.push_str(progress);
        }
        line
    }

    /// Scheduled time in a readable form, falling back to the raw text.
    #[must_use]
    pub fn scheduled_for(&self) -> Option<String> {
        self.scheduled_time.as_ref().map(|raw| {
            raw.parse::<DateTime<Utc>>()
                .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|_| raw.clone())
        })
    }
}

/// Error and log text from a OneView task or an ICsp job.
fn task_log(value: &Value) -> String {
    let mut lines = Vec::new();
    let mut push = |text: Option<&str>| {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            lines.push(text.to_string());
        }
    };

    for error in value
        .get("taskErrors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        push(error.get("message").and_then(Value::as_str));
        push(error.get("details").and_then(Value::as_str));
        for action in error
            .get("recommendedActions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            push(action.as_str());
        }
    }
    for result in value
        .get("jobResult")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        push(result.get("jobResultLogDetails").and_then(Value::as_str));
        push(result.get("jobResultErrorDetails").and_then(Value::as_str));
    }
    lines.join("\n")
}

/// Receives one update per poll.
pub trait TaskProgress {
    /// Called after every poll, including the first.
    fn update(&self, task: &Task);

    /// Called once when the task reaches a terminal state.
    fn finish(&self, _task: &Task) {}
}

/// Progress sink that discards updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TaskProgress for NoProgress {
    fn update(&self, _task: &Task) {}
}

/// How monitoring ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The task finished successfully.
    Completed(Task),
    /// The task is scheduled to run later.
    Scheduled(Task),
}

/// Polls tasks until they reach a terminal state.
///
/// The monitor blocks and never times out; completion is defined by the
/// appliance.
#[derive(Clone, Copy)]
pub struct TaskMonitor<'a> {
    appliance: &'a dyn Appliance,
    interval: Duration,
    progress: &'a dyn TaskProgress,
}

impl<'a> TaskMonitor<'a> {
    pub fn new(appliance: &'a dyn Appliance) -> Self {
        Self {
            appliance,
            interval: POLL_INTERVAL,
            progress: &NoProgress,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn TaskProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Poll the task described by `submitted` until it is terminal.
    pub fn wait(&self, submitted: &Value) -> Result<TaskOutcome> {
        let mut task = Task::from_value(submitted);
        let Some(uri) = task.uri.clone() else {
            return Err(Error::JobNotStarted(format!(
                "no task URI in appliance response: {submitted}"
            )));
        };

        loop {
            self.progress.update(&task);
            match task.state {
                TaskState::Success => {
                    log::debug!("Task {uri} completed");
                    self.progress.finish(&task);
                    return Ok(TaskOutcome::Completed(task));
                }
                TaskState::Failure => {
                    self.progress.finish(&task);
                    return Err(Error::Task {
                        name: task.name,
                        log: task.log,
                    });
                }
                TaskState::Pending => {
                    log::warn!(
                        "Task {uri} is scheduled for {}",
                        task.scheduled_for().unwrap_or_else(|| "later".to_string())
                    );
                    self.progress.finish(&task);
                    return Ok(TaskOutcome::Scheduled(task));
                }
                TaskState::Running => {
                    if !self.interval.is_zero() {
                        thread::sleep(self.interval);
                    }
                    let current = self.appliance.get(&uri)?.ok_or_else(|| Error::Task {
                        name: task.name.clone(),
                        log: format!("task {uri} disappeared"),
                    })?;
                    task = Task::from_value(&current);
                    if task.uri.is_none() {
                        task.uri = Some(uri.clone());
                    }
                }
            }
        }
    }
}
