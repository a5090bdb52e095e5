//! Builder: materializes a component and its file in the graph.

use crate::{node_id, require_str};
use async_trait::async_trait;
use serde_json::json;
use taskweave_core::{
    Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Mutation, NodeId, Task,
};

/// Creates a component node with a backing file node, linked by a
/// `contains` edge. When an `intent` input names an existing intent node,
/// the component is linked to it with an `implements` edge.
#[derive(Debug, Default)]
pub struct BuilderAgent;

impl BuilderAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for BuilderAgent {
    async fn process(
        &self,
        task: &Task,
        graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError> {
        let component = require_str(task, "component")?;
        // Both derived ids stand or fall with the raw name; validate it
        // once so any failure points at the caller's input.
        node_id(component, "component")?;
        let component_id = node_id(&format!("component-{component}"), "component")?;
        let file_id = node_id(&format!("file-{component}"), "file")?;

        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let mut outcome = AgentOutcome::empty()
            .with_mutation(Mutation::put_node(
                component_id.clone(),
                "component",
                json!({ "name": component, "task": task.id.as_str() }),
            ))
            .with_mutation(Mutation::put_node(
                file_id.clone(),
                "file",
                json!({ "path": format!("src/{component}.rs") }),
            ))
            .with_mutation(Mutation::put_edge(
                component_id.clone(),
                file_id.clone(),
                "contains",
            ));

        if let Some(intent) = task.inputs.get("intent").and_then(|v| v.as_str()) {
            let intent_id: NodeId = node_id(intent, "intent")?;
            if !graph.contains_node(&intent_id) {
                return Err(AgentError::failed(format!(
                    "intent '{intent}' does not exist in the graph"
                )));
            }
            outcome = outcome.with_mutation(Mutation::put_edge(
                component_id.clone(),
                intent_id,
                "implements",
            ));
        }

        Ok(outcome
            .with_output("component_node", json!(component_id.as_str()))
            .with_output("file_node", json!(file_id.as_str())))
    }
}
