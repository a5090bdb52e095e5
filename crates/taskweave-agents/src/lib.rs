//! # Taskweave Agents
//!
//! The built-in capability variants. Each agent is one mapping from
//! `task.inputs` to outputs and proposed graph mutations; none of them
//! touches shared state directly, and all of them observe the
//! cancellation token between steps. Adding a capability means adding a
//! new [`taskweave_core::Agent`] implementation and registering it;
//! the scheduler never changes.
//!
//! | agent      | reads                       | writes to the graph                         |
//! |------------|-----------------------------|---------------------------------------------|
//! | `planner`  | `request`                   | intent node + plan-step nodes and edges     |
//! | `builder`  | `component`, `intent?`      | component + file nodes, contains/implements |
//! | `deployer` | `target`                    | deployment node + deploys edge              |
//! | `analyzer` | —                           | nothing (read-only report)                  |

mod analyzer;
mod builder;
mod deployer;
mod planner;

pub use analyzer::AnalyzerAgent;
pub use builder::BuilderAgent;
pub use deployer::DeployerAgent;
pub use planner::PlannerAgent;

use taskweave_core::{AgentError, NodeId, Task};

/// Fetch a required string input.
pub(crate) fn require_str<'a>(task: &'a Task, key: &str) -> Result<&'a str, AgentError> {
    task.inputs
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::InvalidInput {
            field: key.to_string(),
            reason: "expected a string value".to_string(),
        })
}

/// Parse an input string as a node id.
pub(crate) fn node_id(value: &str, field: &str) -> Result<NodeId, AgentError> {
    NodeId::parse(value).map_err(|e| AgentError::InvalidInput {
        field: field.to_string(),
        reason: e.to_string(),
    })
}
