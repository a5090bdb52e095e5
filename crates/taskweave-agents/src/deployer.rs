//! Deployer: records a deployment of an existing component.

use crate::{node_id, require_str};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use taskweave_core::{
    Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Mutation, NodeId, Task,
};

/// Records a deployment node pointing at the target component with a
/// `deploys` edge. Fails cleanly when the target is missing from the
/// snapshot; nothing is half-deployed.
#[derive(Debug, Default)]
pub struct DeployerAgent;

impl DeployerAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for DeployerAgent {
    async fn process(
        &self,
        task: &Task,
        graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError> {
        let target = require_str(task, "target")?;
        let target_id = node_id(target, "target")?;
        if !graph.contains_node(&target_id) {
            return Err(AgentError::failed(format!(
                "deployment target '{target}' does not exist in the graph"
            )));
        }
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let deploy_id = NodeId::parse(format!("deploy-{}", task.id))
            .map_err(|e| AgentError::failed(format!("cannot derive deployment id: {e}")))?;
        let outcome = AgentOutcome::empty()
            .with_mutation(Mutation::put_node(
                deploy_id.clone(),
                "deployment",
                json!({
                    "target": target,
                    "deployed_at": Utc::now().to_rfc3339(),
                }),
            ))
            .with_mutation(Mutation::put_edge(deploy_id.clone(), target_id, "deploys"))
            .with_output("deployment", json!(deploy_id.as_str()));
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::{AgentId, TaskId};
    use taskweave_graph::MemoryGraph;

    fn deploy_task(target: &str) -> Task {
        Task::new(
            TaskId::parse("t3").unwrap(),
            AgentId::parse("deployer").unwrap(),
        )
        .with_input("target", json!(target))
    }

    #[tokio::test]
    async fn deploys_existing_component() {
        let graph = MemoryGraph::new();
        graph
            .commit(graph.propose(vec![Mutation::put_node(
                NodeId::parse("component-api").unwrap(),
                "component",
                json!({}),
            )]))
            .unwrap();

        let outcome = DeployerAgent::new()
            .process(
                &deploy_task("component-api"),
                graph.snapshot(),
                CancelToken::never(),
            )
            .await
            .unwrap();
        graph.commit(graph.propose(outcome.mutations)).unwrap();

        let snap = graph.snapshot();
        assert!(snap.contains_node(&NodeId::parse("deploy-t3").unwrap()));
        assert_eq!(snap.edge_count(), 1);
    }

    #[tokio::test]
    async fn missing_target_fails_cleanly() {
        let err = DeployerAgent::new()
            .process(
                &deploy_task("component-ghost"),
                GraphSnapshot::empty(),
                CancelToken::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ProcessingFailed { .. }));
    }
}
