//! # Agent Contract
//!
//! The capability seam of the runtime. Every agent variant implements
//! exactly one operation: turn a task plus a read-only graph snapshot
//! into outputs and a batch of *proposed* graph mutations. Agents never
//! apply mutations themselves; the scheduler commits them, so a slow or
//! misbehaving agent can never hold the graph hostage.
//!
//! Agents must honor the cancellation token promptly. The usual shape is
//! to check [`CancelToken::is_cancelled`] between steps, or to
//! `tokio::select!` on [`CancelToken::cancelled`] around long awaits, and
//! return [`AgentError::Cancelled`] once observed.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use taskweave_core::{
//!     Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Task,
//! };
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl Agent for EchoAgent {
//!     async fn process(
//!         &self,
//!         task: &Task,
//!         _graph: GraphSnapshot,
//!         cancel: CancelToken,
//!     ) -> Result<AgentOutcome, AgentError> {
//!         if cancel.is_cancelled() {
//!             return Err(AgentError::Cancelled);
//!         }
//!         let mut outcome = AgentOutcome::empty();
//!         outcome
//!             .outputs
//!             .insert("echo".into(), serde_json::json!(task.title));
//!         Ok(outcome)
//!     }
//! }
//! ```

use crate::cancel::CancelToken;
use crate::error::AgentError;
use crate::graph::{GraphSnapshot, Mutation};
use crate::task::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What an agent hands back to the scheduler: outputs for the task record
/// plus the graph edits it wants committed on its behalf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub outputs: HashMap<String, serde_json::Value>,
    pub mutations: Vec<Mutation>,
}

impl AgentOutcome {
    /// No outputs, no mutations.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.outputs.insert(key.into(), value);
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }
}

/// A specialized worker resolvable by id through the registry.
///
/// Implementations must be cheap to share (`Send + Sync`); the runtime
/// holds each agent in an `Arc` and may invoke it for several tasks
/// concurrently. Whether an agent serializes its own work internally is
/// the agent's choice, not the runtime's.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Process one task against a consistent read view of the graph.
    ///
    /// The snapshot is immutable; desired edits go into the returned
    /// outcome as proposed mutations. The scheduler may call this again
    /// with a fresh snapshot if the commit loses an optimistic race, so
    /// the mapping should be deterministic in the snapshot it is given.
    async fn process(
        &self,
        task: &Task,
        graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError>;

    /// Liveness probe driven by the registry. Defaults to healthy;
    /// agents wrapping external resources override this.
    async fn heartbeat(&self) -> bool {
        true
    }
}
