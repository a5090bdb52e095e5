//! # Taskweave Runtime
//!
//! The orchestration layer: an [`AgentRegistry`] that owns agent identity,
//! health, and availability, and a [`TaskScheduler`] that drives each task
//! through its lifecycle (resolve, gate, invoke, commit) against the
//! shared memory graph.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskweave_core::{AgentId, Task, TaskId};
//! use taskweave_graph::MemoryGraph;
//! use taskweave_runtime::TaskScheduler;
//!
//! # async fn run(agent: Arc<dyn taskweave_core::Agent>) {
//! let graph = Arc::new(MemoryGraph::new());
//! let scheduler = TaskScheduler::new(Arc::clone(&graph));
//! scheduler
//!     .registry()
//!     .register(AgentId::parse("planner").unwrap(), agent)
//!     .unwrap();
//!
//! let task = Task::new(
//!     TaskId::parse("t1").unwrap(),
//!     AgentId::parse("planner").unwrap(),
//! );
//! let result = scheduler.execute_task(task).await;
//! assert!(result.success);
//! # }
//! ```

pub mod config;
pub mod history;
pub mod registry;
pub mod scheduler;

pub use config::RuntimeConfig;
pub use history::TaskHistory;
pub use registry::{AgentRegistry, AgentStatus};
pub use scheduler::TaskScheduler;
