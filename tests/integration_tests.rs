//! End-to-end scenarios for the orchestration runtime.
//!
//! These tests wire real schedulers, registries, and graphs together,
//! built-in and mock agents included, and verify the externally observable
//! contract: task lifecycle ordering, graph versioning, optimistic
//! conflict handling, availability gating, and deadline behavior.

use std::sync::Arc;
use std::time::Duration;
use taskweave::{
    AgentId, Mutation, NodeId, QueryPattern, Task, TaskErrorKind, TaskId, TaskStatus, TypeInterest,
};
use taskweave::{AnalyzerAgent, BuilderAgent, DeployerAgent, PlannerAgent};
use taskweave_testing::{MockAgent, TestRuntime};

fn task_id(s: &str) -> TaskId {
    TaskId::parse(s).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn full_runtime() -> TestRuntime {
    init_tracing();
    let runtime = TestRuntime::new();
    runtime
        .register("planner", Arc::new(PlannerAgent::new()))
        .register("builder", Arc::new(BuilderAgent::new()))
        .register("deployer", Arc::new(DeployerAgent::new()))
        .register("analyzer", Arc::new(AnalyzerAgent::new()));
    runtime
}

#[tokio::test]
async fn planner_hello_world_scenario() {
    let runtime = full_runtime();
    let task = runtime
        .task("t1", "planner")
        .with_title("hello world")
        .with_input(
            "request",
            serde_json::json!("Create a simple hello world function"),
        );

    let before = runtime.graph().version();
    let result = runtime.run(task).await;

    assert!(result.success);
    assert!(result.error.is_none());
    assert!(!result.outputs.is_empty());
    assert!(runtime.graph().version() > before);

    // History shows the completed lifecycle: started, then finished.
    let record = runtime
        .scheduler()
        .history()
        .task(&task_id("t1"))
        .expect("task retained in history");
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.progress, 100);
    let started = record.started_at.expect("started_at recorded");
    let completed = record.completed_at.expect("completed_at recorded");
    assert!(started <= completed);

    // The plan landed in the graph.
    let snap = runtime.graph().snapshot();
    assert!(snap.contains_node(&NodeId::parse("intent-t1").unwrap()));
    let steps = snap
        .query(&QueryPattern::edges_of_type("plan-step"))
        .count();
    assert!(steps >= 3);
}

#[tokio::test]
async fn unknown_agent_returns_not_found_and_leaves_task_pending() {
    let runtime = full_runtime();
    let result = runtime.run(runtime.task("t1", "unknown-agent")).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_ref().unwrap().kind,
        TaskErrorKind::AgentNotFound
    );

    let record = runtime.scheduler().history().task(&task_id("t1")).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert!(record.started_at.is_none());
    assert_eq!(runtime.graph().version(), 0);
}

#[tokio::test]
async fn disabling_an_agent_gates_execution_without_marking_running() {
    let runtime = full_runtime();
    runtime
        .scheduler()
        .registry()
        .set_enabled(&AgentId::parse("builder").unwrap(), false)
        .unwrap();

    let task = runtime
        .task("t1", "builder")
        .with_input("component", serde_json::json!("api"));
    let result = runtime.run(task).await;

    assert_eq!(
        result.error.as_ref().unwrap().kind,
        TaskErrorKind::AgentUnavailable
    );
    let record = runtime.scheduler().history().task(&task_id("t1")).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);

    // The status surface reflects the gate.
    let statuses = runtime.scheduler().agent_statuses();
    let builder = statuses
        .iter()
        .find(|s| s.agent_id.as_str() == "builder")
        .unwrap();
    assert!(!builder.is_enabled);
    assert!(builder.is_healthy);
}

#[tokio::test]
async fn agent_statuses_are_stable_ordered() {
    let runtime = full_runtime();
    let statuses = runtime.scheduler().agent_statuses();
    let ids: Vec<&str> = statuses.iter().map(|s| s.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["analyzer", "builder", "deployer", "planner"]);
}

#[tokio::test]
async fn unhealthy_probe_gates_execution_until_recovery() {
    let runtime = TestRuntime::new();
    let mock = Arc::new(MockAgent::new());
    runtime.register("worker", Arc::clone(&mock) as Arc<dyn taskweave::Agent>);

    mock.set_healthy(false);
    runtime
        .scheduler()
        .registry()
        .probe(&AgentId::parse("worker").unwrap())
        .await
        .unwrap();

    let result = runtime.run(runtime.task("t1", "worker")).await;
    assert_eq!(
        result.error.as_ref().unwrap().kind,
        TaskErrorKind::AgentUnavailable
    );

    mock.set_healthy(true);
    runtime
        .scheduler()
        .registry()
        .probe(&AgentId::parse("worker").unwrap())
        .await
        .unwrap();
    assert!(runtime.run(runtime.task("t1", "worker")).await.success);
}

#[tokio::test]
async fn never_returning_agent_resolves_to_timeout_within_grace() {
    let runtime = TestRuntime::new();
    runtime.register(
        "stuck",
        Arc::new(
            MockAgent::new()
                .with_delay(Duration::from_secs(600))
                .ignoring_cancellation(),
        ),
    );

    let started = std::time::Instant::now();
    let result = runtime.run(runtime.task("t1", "stuck")).await;

    assert_eq!(
        result.error.as_ref().unwrap().kind,
        TaskErrorKind::TaskTimeout
    );
    // 500ms deadline + 100ms grace, generous margin for CI.
    assert!(started.elapsed() < Duration::from_secs(10));
    let record = runtime.scheduler().history().task(&task_id("t1")).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
}

#[tokio::test]
async fn concurrent_overlapping_proposals_keep_one_edge_and_trace_one_retry() {
    let runtime = TestRuntime::new();
    let shared = NodeId::parse("shared").unwrap();
    let target = NodeId::parse("target").unwrap();
    let mutations = vec![
        Mutation::put_node(shared.clone(), "component", serde_json::json!({})),
        Mutation::put_node(target.clone(), "file", serde_json::json!({})),
        Mutation::put_edge(shared.clone(), target.clone(), "contains"),
    ];

    // Both agents sleep long enough to overlap, so both snapshot the
    // same base version and exactly one commit loses the race.
    for name in ["left", "right"] {
        runtime.register(
            name,
            Arc::new(
                MockAgent::new()
                    .with_default_mutations(mutations.clone())
                    .with_delay(Duration::from_millis(50)),
            ),
        );
    }

    let (a, b) = tokio::join!(
        runtime.run(runtime.task("ta", "left")),
        runtime.run(runtime.task("tb", "right")),
    );

    assert!(a.success && b.success);
    assert_eq!(
        a.conflict_retries + b.conflict_retries,
        1,
        "exactly one task should have retried after the conflict"
    );

    let snap = runtime.graph().snapshot();
    let contains_edges = snap
        .query(&QueryPattern::edges_of_type("contains"))
        .count();
    assert_eq!(contains_edges, 1);
    assert_eq!(snap.node_count(), 2);
}

#[tokio::test]
async fn commits_are_causally_ordered_through_the_version_counter() {
    let runtime = full_runtime();

    let plan = runtime
        .task("t1", "planner")
        .with_input("request", serde_json::json!("build the api component"));
    assert!(runtime.run(plan).await.success);

    // A later task's snapshot sees the planner's intent, so the builder
    // can link to it.
    let build = runtime
        .task("t2", "builder")
        .with_input("component", serde_json::json!("api"))
        .with_input("intent", serde_json::json!("intent-t1"));
    let result = runtime.run(build).await;
    assert!(result.success);

    let snap = runtime.graph().snapshot();
    let implements = snap
        .query(&QueryPattern::edges_of_type("implements"))
        .count();
    assert_eq!(implements, 1);

    // And the deployer builds on top of both.
    let deploy = runtime
        .task("t3", "deployer")
        .with_input("target", serde_json::json!("component-api"));
    assert!(runtime.run(deploy).await.success);
}

#[tokio::test]
async fn analyzer_succeeds_without_mutations_and_still_bumps_the_version() {
    let runtime = full_runtime();
    let before = runtime.graph().version();

    let result = runtime.run(runtime.task("t1", "analyzer")).await;
    assert!(result.success);
    assert_eq!(result.outputs["total_nodes"], serde_json::json!(0));
    assert!(runtime.graph().version() > before);
}

#[tokio::test]
async fn subscribers_are_notified_after_matching_commits() {
    let runtime = full_runtime();
    let mut sub = runtime
        .graph()
        .subscribe(TypeInterest::default().with_node_type("intent"));

    let task = runtime
        .task("t1", "planner")
        .with_input("request", serde_json::json!("notify me"));
    assert!(runtime.run(task).await.success);

    let event = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("notification within a second")
        .expect("graph still alive");
    assert!(event.node_types.contains("intent"));
    // The snapshot taken after the event is at least as new.
    assert!(runtime.graph().snapshot().version() >= event.version);
}

#[tokio::test]
async fn explicit_cancellation_finalizes_as_cancelled() {
    let runtime = TestRuntime::new();
    runtime.register(
        "slow",
        Arc::new(MockAgent::new().with_delay(Duration::from_secs(600))),
    );

    let scheduler = Arc::clone(runtime.scheduler());
    let task = runtime.task("t1", "slow");
    let exec = tokio::spawn(async move { scheduler.execute_task(task).await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(runtime.scheduler().cancel_task(&task_id("t1")));

    let result = exec.await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_ref().unwrap().kind, TaskErrorKind::Cancelled);
    let record = runtime.scheduler().history().task(&task_id("t1")).unwrap();
    assert_eq!(record.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn every_outcome_is_retained_in_history() {
    let runtime = full_runtime();
    runtime.register(
        "flaky",
        Arc::new(MockAgent::new().with_failure("t2", "simulated outage")),
    );

    let ok = runtime
        .task("t1", "planner")
        .with_input("request", serde_json::json!("plan something"));
    let bad = runtime.task("t2", "flaky");
    let missing = runtime.task("t3", "nobody");

    runtime.run(ok).await;
    runtime.run(bad).await;
    runtime.run(missing).await;

    let history = runtime.scheduler().history();
    assert_eq!(history.len(), 3);
    assert_eq!(history.task(&task_id("t1")).unwrap().status, TaskStatus::Completed);

    let failed = history.task(&task_id("t2")).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(
        failed.error.as_ref().unwrap().kind,
        TaskErrorKind::AgentFailure
    );

    let rejected = history.task(&task_id("t3")).unwrap();
    assert_eq!(rejected.status, TaskStatus::Pending);
    assert_eq!(
        rejected.error.as_ref().unwrap().kind,
        TaskErrorKind::AgentNotFound
    );
}

#[tokio::test]
async fn tasks_for_different_agents_run_concurrently() {
    let runtime = TestRuntime::new();
    for name in ["a", "b", "c"] {
        runtime.register(
            name,
            Arc::new(MockAgent::new().with_delay(Duration::from_millis(100))),
        );
    }

    let started = std::time::Instant::now();
    let results = futures::future::join_all(
        ["t-a", "t-b", "t-c"]
            .iter()
            .zip(["a", "b", "c"])
            .map(|(task, agent)| runtime.run(runtime.task(task, agent))),
    )
    .await;
    assert!(results.iter().all(|r| r.success));
    // Serial execution would take 300ms+; concurrent stays well under.
    assert!(started.elapsed() < Duration::from_millis(280));
}

#[tokio::test]
async fn task_submission_shape_round_trips_as_json() {
    // The caller-constructed submission shape from the boundary surface.
    let task: Task = serde_json::from_value(serde_json::json!({
        "id": "t1",
        "title": "Build hello world",
        "description": "A first task",
        "agent_id": "planner",
        "status": "pending",
        "priority": "high",
        "inputs": { "request": "Create a simple hello world function" },
        "progress": 0,
        "created_at": "2025-01-15T10:00:00Z",
    }))
    .unwrap();

    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.agent_id.as_str(), "planner");

    let runtime = full_runtime();
    let result = runtime.run(task).await;
    assert!(result.success);
}
