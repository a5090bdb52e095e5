//! Task model: the unit of work routed to an agent.
//!
//! A task is created by a caller in `Pending` state, mutated only by the
//! scheduler while it executes, and retained immutably in history after it
//! reaches a terminal state. Status transitions form a one-way DAG:
//!
//! ```text
//! pending ──▶ running ──▶ completed
//!    │           │    └──▶ failed
//!    └───────────┴───────▶ cancelled
//! ```
//!
//! A task never re-enters `running` after reaching a terminal state, and
//! progress is monotonically non-decreasing while running.

use crate::error::TaskErrorKind;
use crate::identifiers::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states are final; nothing transitions out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition in the lifecycle DAG.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority hint carried on the task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Structured failure attached to a task record and its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Attempted transition that would violate the lifecycle DAG.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal task transition {from} -> {to}")]
    IllegalTransition { from: TaskStatus, to: TaskStatus },

    #[error("progress may not regress from {current} to {requested}")]
    ProgressRegression { current: u8, requested: u8 },

    #[error("progress can only change while running (status is {status})")]
    NotRunning { status: TaskStatus },
}

/// A unit of work routed to one agent by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub agent_id: AgentId,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub inputs: HashMap<String, serde_json::Value>,
    /// Present only after successful completion.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub outputs: HashMap<String, serde_json::Value>,
    /// 0..=100, monotone while running.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl Task {
    /// Create a pending task for the given agent.
    pub fn new(id: TaskId, agent_id: AgentId) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            agent_id,
            status: TaskStatus::Pending,
            priority: TaskPriority::default(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move `pending -> running`, recording the start time.
    pub fn mark_running(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Running)?;
        self.started_at = Some(Utc::now());
        self.progress = 0;
        Ok(())
    }

    /// Update progress; only legal while running, never decreasing.
    pub fn set_progress(&mut self, progress: u8) -> Result<(), TransitionError> {
        if self.status != TaskStatus::Running {
            return Err(TransitionError::NotRunning {
                status: self.status,
            });
        }
        let progress = progress.min(100);
        if progress < self.progress {
            return Err(TransitionError::ProgressRegression {
                current: self.progress,
                requested: progress,
            });
        }
        self.progress = progress;
        Ok(())
    }

    /// Move `running -> completed`, attaching outputs.
    pub fn mark_completed(
        &mut self,
        outputs: HashMap<String, serde_json::Value>,
    ) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Completed)?;
        self.outputs = outputs;
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Move `running -> failed`, attaching the structured error.
    pub fn mark_failed(&mut self, error: TaskError) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Move `pending|running -> cancelled`.
    pub fn mark_cancelled(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Cancelled)?;
        self.error = Some(TaskError::new(
            TaskErrorKind::Cancelled,
            "task cancelled by caller",
        ));
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Immutable outcome of one `execute_task` call, attached to the task
/// record in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub outputs: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    /// Number of agent re-invocations caused by commit conflicts.
    #[serde(default)]
    pub conflict_retries: u32,
}

impl TaskResult {
    /// Successful outcome with outputs.
    pub fn success(
        duration: Duration,
        outputs: HashMap<String, serde_json::Value>,
        conflict_retries: u32,
    ) -> Self {
        Self {
            success: true,
            duration_ms: duration.as_millis() as u64,
            outputs,
            error: None,
            conflict_retries,
        }
    }

    /// Failed outcome carrying the structured error.
    pub fn failure(duration: Duration, error: TaskError, conflict_retries: u32) -> Self {
        Self {
            success: false,
            duration_ms: duration.as_millis() as u64,
            outputs: HashMap::new(),
            error: Some(error),
            conflict_retries,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
