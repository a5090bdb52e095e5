//! # Taskweave
//!
//! Taskweave is an in-process agent orchestration runtime. Callers submit
//! tasks; the runtime routes each one to a named agent, executes it under
//! health/availability gating and a deadline, and commits the agent's
//! proposed mutations into a shared versioned memory graph with
//! optimistic concurrency.
//!
//! ## Core Components
//!
//! - **[Agent]**: the capability contract, one operation turning a task
//!   plus a graph snapshot into outputs and proposed mutations
//! - **[MemoryGraph]**: the versioned store of typed nodes and edges,
//!   with copy-on-write snapshots and all-or-nothing commits
//! - **[AgentRegistry]**: identity, health, and availability of agents
//! - **[TaskScheduler]**: the orchestrator driving the task lifecycle
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use taskweave::{
//!     AgentId, MemoryGraph, PlannerAgent, Task, TaskId, TaskScheduler,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let graph = Arc::new(MemoryGraph::new());
//! let scheduler = TaskScheduler::new(Arc::clone(&graph));
//! scheduler
//!     .registry()
//!     .register(AgentId::parse("planner").unwrap(), Arc::new(PlannerAgent::new()))
//!     .unwrap();
//!
//! let task = Task::new(
//!     TaskId::parse("t1").unwrap(),
//!     AgentId::parse("planner").unwrap(),
//! )
//! .with_input("request", serde_json::json!("Create a simple hello world function"));
//!
//! let result = scheduler.execute_task(task).await;
//! assert!(result.success);
//! assert!(graph.version() > 0);
//! # }
//! ```

// Namespaced access to the member crates.
pub use taskweave_agents as agents;
pub use taskweave_graph as graph;
pub use taskweave_runtime as runtime;

// Flat re-exports of the common surface.
pub use taskweave_agents::{AnalyzerAgent, BuilderAgent, DeployerAgent, PlannerAgent};
pub use taskweave_core::{
    cancel_pair, Agent, AgentError, AgentId, AgentOutcome, CancelHandle, CancelToken, ChangeSet,
    EdgeKey, GraphError, GraphSnapshot, MemoryEdge, MemoryNode, Mutation, NodeId, QueryMatch,
    QueryPattern, RegistryError, Task, TaskError, TaskErrorKind, TaskId, TaskPriority, TaskResult,
    TaskStatus, ValidationError,
};
pub use taskweave_graph::{GraphEvent, GraphSubscription, MemoryGraph, TypeInterest};
pub use taskweave_runtime::{
    AgentRegistry, AgentStatus, RuntimeConfig, TaskHistory, TaskScheduler,
};
