//! # Taskweave Core
//!
//! Core traits and types for the Taskweave orchestration runtime.
//! This crate provides the fundamental building blocks shared by the
//! memory graph, the agent registry, and the task scheduler: validated
//! identifiers, the task model, the agent capability contract, the
//! cancellation signal, and the error taxonomy.

pub mod agent;
pub mod cancel;
pub mod error;
pub mod graph;
pub mod identifiers;
pub mod task;

pub use agent::{Agent, AgentOutcome};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use error::{AgentError, GraphError, RegistryError, TaskErrorKind, ValidationError};
pub use graph::{
    ChangeSet, EdgeKey, GraphSnapshot, MemoryEdge, MemoryNode, Mutation, QueryPattern,
};
pub use graph::QueryMatch;
pub use identifiers::{AgentId, IdError, NodeId, TaskId};
pub use task::{Task, TaskError, TaskPriority, TaskResult, TaskStatus, TransitionError};
