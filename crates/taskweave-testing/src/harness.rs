//! Scenario harness: a graph + scheduler pair with short test timings.

use std::sync::Arc;
use std::time::Duration;
use taskweave_core::{Agent, AgentId, Task, TaskId, TaskResult};
use taskweave_graph::MemoryGraph;
use taskweave_runtime::{RuntimeConfig, TaskScheduler};

/// A runtime wired for tests: tight deadlines, negligible backoff, and
/// convenience accessors for the pieces assertions need.
pub struct TestRuntime {
    graph: Arc<MemoryGraph>,
    scheduler: Arc<TaskScheduler>,
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    /// Build with test-friendly timings (500ms deadline, 100ms grace).
    pub fn new() -> Self {
        Self::with_config(
            RuntimeConfig::default()
                .with_task_timeout(Duration::from_millis(500))
                .with_cancel_grace(Duration::from_millis(100))
                .with_retry_backoff(Duration::from_millis(1)),
        )
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let graph = Arc::new(MemoryGraph::new());
        let scheduler = Arc::new(TaskScheduler::with_config(Arc::clone(&graph), config));
        Self { graph, scheduler }
    }

    /// Register an agent; panics on duplicate ids, which in a test is a
    /// bug in the test.
    pub fn register(&self, id: &str, agent: Arc<dyn Agent>) -> &Self {
        let id = AgentId::parse(id).expect("valid agent id");
        self.scheduler
            .registry()
            .register(id, agent)
            .expect("agent registered once");
        self
    }

    pub fn graph(&self) -> &Arc<MemoryGraph> {
        &self.graph
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Submit a pending task to the named agent and wait for its result.
    pub async fn run(&self, task: Task) -> TaskResult {
        self.scheduler.execute_task(task).await
    }

    /// Shorthand for building a pending task.
    pub fn task(&self, id: &str, agent: &str) -> Task {
        Task::new(
            TaskId::parse(id).expect("valid task id"),
            AgentId::parse(agent).expect("valid agent id"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockAgent;
    use taskweave_core::TaskStatus;

    #[tokio::test]
    async fn harness_runs_a_mock_end_to_end() {
        let runtime = TestRuntime::new();
        runtime.register("mock", Arc::new(MockAgent::new()));

        let result = runtime.run(runtime.task("t1", "mock")).await;
        assert!(result.success);
        let record = runtime
            .scheduler()
            .history()
            .task(&TaskId::parse("t1").unwrap())
            .unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
    }
}
