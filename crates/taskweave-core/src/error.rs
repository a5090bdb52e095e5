//! Error taxonomy for the orchestration runtime.
//!
//! Failures are split by concern: graph consistency (`GraphError`), agent
//! execution (`AgentError`), registry configuration (`RegistryError`), and
//! task-shape validation (`ValidationError`). The scheduler folds every one
//! of them into a structured [`TaskErrorKind`] on the task record, so a
//! caller always receives an outcome instead of a propagated panic or an
//! error thrown across the orchestration boundary.

use crate::identifiers::{AgentId, NodeId, TaskId};
use serde::{Deserialize, Serialize};

/// Errors raised by the memory graph's mutation protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The graph version moved past the change-set's base version.
    /// Transient; callers re-snapshot and retry.
    #[error("mutation conflict: change-set based on version {base}, graph is at {current}")]
    MutationConflict { base: u64, current: u64 },

    /// Committing the batch would leave an edge without one of its
    /// endpoints. The whole commit is aborted.
    #[error("graph integrity violation: edge {from} -> {to} references a missing node")]
    IntegrityViolation { from: NodeId, to: NodeId },

    /// A node removal was requested while edges still reference the node.
    #[error("graph integrity violation: node {id} is still referenced by {edge_count} edge(s)")]
    NodeInUse { id: NodeId, edge_count: usize },
}

/// Errors an agent may return from `process`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The agent observed its cancellation signal and stopped early.
    #[error("agent cancelled before completion")]
    Cancelled,

    /// The task inputs did not satisfy the agent's contract.
    #[error("invalid task input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Domain-level processing failure.
    #[error("agent processing failed: {reason}")]
    ProcessingFailed { reason: String },
}

impl AgentError {
    /// Shorthand for a domain-level failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        AgentError::ProcessingFailed {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the agent registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Registering the same agent id twice is a configuration error,
    /// never last-write-wins.
    #[error("agent '{id}' is already registered")]
    DuplicateAgent { id: AgentId },

    /// No agent is registered under the requested id.
    #[error("agent '{id}' not found")]
    AgentNotFound { id: AgentId },
}

/// Task-shape validation failures. Never retried; the caller must fix
/// the submission and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task id is invalid: {0}")]
    InvalidTaskId(#[from] crate::identifiers::IdError),

    #[error("task '{id}' must be submitted as pending, got {status}")]
    NotPending { id: TaskId, status: String },

    #[error("task '{id}' must be submitted with progress 0, got {progress}")]
    NonZeroProgress { id: TaskId, progress: u8 },

    #[error("task '{id}' was already executed")]
    DuplicateTask { id: TaskId },
}

/// Stable failure classification attached to task records and results.
///
/// The serialized form (`kind` strings) is part of the external interface
/// read by the surrounding application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Malformed task submission; never retried.
    TaskValidationError,
    /// Target agent id is not registered; fatal misconfiguration.
    AgentNotFound,
    /// Agent is unhealthy or disabled; the task stays pending and the
    /// caller may retry later.
    AgentUnavailable,
    /// Optimistic commit lost the race past the retry budget.
    MutationConflict,
    /// Commit would have produced a dangling edge; aborted, not retried.
    GraphIntegrityViolation,
    /// Execution exceeded its deadline; surfaced, not auto-retried.
    TaskTimeout,
    /// The agent itself reported a processing failure.
    AgentFailure,
    /// The task was cancelled by an explicit caller request.
    Cancelled,
}

impl TaskErrorKind {
    /// Stable string form used in serialized task results.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskErrorKind::TaskValidationError => "task_validation_error",
            TaskErrorKind::AgentNotFound => "agent_not_found",
            TaskErrorKind::AgentUnavailable => "agent_unavailable",
            TaskErrorKind::MutationConflict => "mutation_conflict",
            TaskErrorKind::GraphIntegrityViolation => "graph_integrity_violation",
            TaskErrorKind::TaskTimeout => "task_timeout",
            TaskErrorKind::AgentFailure => "agent_failure",
            TaskErrorKind::Cancelled => "cancelled",
        }
    }

    /// Whether the caller may safely resubmit the same task unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskErrorKind::AgentUnavailable | TaskErrorKind::MutationConflict
        )
    }
}

impl std::fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
