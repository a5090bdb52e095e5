//! Mock agents with scripted, observable behavior.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use taskweave_core::{
    Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Mutation, Task,
};

#[derive(Clone)]
enum Scripted {
    Succeed(AgentOutcome),
    Fail(String),
}

/// An agent that returns predefined outcomes, optionally after a delay,
/// while recording every task id it was invoked with.
///
/// Responses are keyed by task id; unmatched tasks get the default
/// response (an empty success unless overridden).
#[derive(Clone)]
pub struct MockAgent {
    responses: HashMap<String, Scripted>,
    default_response: Scripted,
    delay: Option<Duration>,
    ignore_cancellation: bool,
    healthy: Arc<Mutex<bool>>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    /// An agent that succeeds with an empty outcome for every task.
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            default_response: Scripted::Succeed(AgentOutcome::empty()),
            delay: None,
            ignore_cancellation: false,
            healthy: Arc::new(Mutex::new(true)),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a successful outcome for one task id.
    pub fn with_outcome(mut self, task_id: impl Into<String>, outcome: AgentOutcome) -> Self {
        self.responses
            .insert(task_id.into(), Scripted::Succeed(outcome));
        self
    }

    /// Script a failure for one task id.
    pub fn with_failure(mut self, task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        self.responses
            .insert(task_id.into(), Scripted::Fail(reason.into()));
        self
    }

    /// Default outcome for unmatched task ids.
    pub fn with_default_outcome(mut self, outcome: AgentOutcome) -> Self {
        self.default_response = Scripted::Succeed(outcome);
        self
    }

    /// Propose these mutations for every task.
    pub fn with_default_mutations(mut self, mutations: Vec<Mutation>) -> Self {
        self.default_response = Scripted::Succeed(AgentOutcome {
            outputs: HashMap::new(),
            mutations,
        });
        self
    }

    /// Sleep this long before answering (cancellable unless
    /// [`Self::ignoring_cancellation`] is set).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep through the cancellation signal instead of honoring it,
    /// for exercising the runtime's grace-period force-finalization.
    pub fn ignoring_cancellation(mut self) -> Self {
        self.ignore_cancellation = true;
        self
    }

    /// Flip the health reported by `heartbeat`.
    pub fn set_healthy(&self, healthy: bool) {
        *self
            .healthy
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = healthy;
    }

    /// Task ids this agent has been invoked with, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of invocations so far.
    pub fn invocation_count(&self) -> usize {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn process(
        &self,
        task: &Task,
        _graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.id.as_str().to_string());

        if let Some(delay) = self.delay {
            if self.ignore_cancellation {
                tokio::time::sleep(delay).await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                }
            }
        }
        if cancel.is_cancelled() && !self.ignore_cancellation {
            return Err(AgentError::Cancelled);
        }

        let scripted = self
            .responses
            .get(task.id.as_str())
            .unwrap_or(&self.default_response);
        match scripted {
            Scripted::Succeed(outcome) => Ok(outcome.clone()),
            Scripted::Fail(reason) => Err(AgentError::failed(reason.clone())),
        }
    }

    async fn heartbeat(&self) -> bool {
        *self
            .healthy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskweave_core::{AgentId, TaskId};

    fn task(id: &str) -> Task {
        Task::new(TaskId::parse(id).unwrap(), AgentId::parse("mock").unwrap())
    }

    #[tokio::test]
    async fn scripted_responses_by_task_id() {
        let agent = MockAgent::new()
            .with_outcome(
                "t1",
                AgentOutcome::empty().with_output("answer", json!(42)),
            )
            .with_failure("t2", "scripted failure");

        let ok = agent
            .process(&task("t1"), GraphSnapshot::empty(), CancelToken::never())
            .await
            .unwrap();
        assert_eq!(ok.outputs["answer"], json!(42));

        let err = agent
            .process(&task("t2"), GraphSnapshot::empty(), CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ProcessingFailed { .. }));

        // Unmatched ids fall through to the default empty success.
        assert!(agent
            .process(&task("t3"), GraphSnapshot::empty(), CancelToken::never())
            .await
            .is_ok());
        assert_eq!(agent.invocations(), vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn delay_is_cancellable() {
        let agent = MockAgent::new().with_delay(Duration::from_secs(60));
        let (handle, token) = taskweave_core::cancel_pair();
        handle.cancel();
        let err = agent
            .process(&task("t1"), GraphSnapshot::empty(), token)
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::Cancelled);
    }

    #[tokio::test]
    async fn health_is_togglable() {
        let agent = MockAgent::new();
        assert!(agent.heartbeat().await);
        agent.set_healthy(false);
        assert!(!agent.heartbeat().await);
    }
}
