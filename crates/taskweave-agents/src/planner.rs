//! Planner: turns a free-form request into an intent plus plan steps.

use crate::require_str;
use async_trait::async_trait;
use serde_json::json;
use taskweave_core::{
    Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Mutation, NodeId, Task,
};

/// Breaks a request down into a fixed sequence of plan steps and records
/// the intent in the graph. The derived node ids are deterministic in the
/// task id, so a conflict-triggered re-invocation proposes the same plan.
#[derive(Debug, Default)]
pub struct PlannerAgent;

impl PlannerAgent {
    pub fn new() -> Self {
        Self
    }

    fn steps(request: &str) -> Vec<String> {
        let mut steps = vec![format!("analyze request: {request}")];
        if request.to_ascii_lowercase().contains("test") {
            steps.push("write failing tests".to_string());
        }
        steps.push("implement the change".to_string());
        steps.push("verify the result".to_string());
        steps
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    async fn process(
        &self,
        task: &Task,
        _graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError> {
        let request = require_str(task, "request")?;
        let steps = Self::steps(request);

        let intent_id = NodeId::parse(format!("intent-{}", task.id))
            .map_err(|e| AgentError::failed(format!("cannot derive intent id: {e}")))?;
        let mut outcome = AgentOutcome::empty().with_mutation(Mutation::put_node(
            intent_id.clone(),
            "intent",
            json!({ "request": request, "task": task.id.as_str() }),
        ));

        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let step_id = NodeId::parse(format!("step-{}-{}", index, task.id))
                .map_err(|e| AgentError::failed(format!("cannot derive step id: {e}")))?;
            outcome = outcome
                .with_mutation(Mutation::put_node(
                    step_id.clone(),
                    "plan-step",
                    json!({ "order": index, "description": step }),
                ))
                .with_mutation(Mutation::put_edge(
                    intent_id.clone(),
                    step_id,
                    "plan-step",
                ));
        }

        tracing::debug!(task = %task.id, steps = steps.len(), "plan derived");
        Ok(outcome
            .with_output("intent", json!(intent_id.as_str()))
            .with_output("plan", json!(steps)))
    }
}
