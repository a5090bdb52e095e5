//! Task scheduler: the top-level orchestrator.
//!
//! `execute_task` drives one task through its lifecycle: validate the
//! submission, resolve the target agent, gate on health/availability,
//! invoke the agent against a graph snapshot under a deadline, commit the
//! proposed mutations optimistically (re-invoking on conflict up to the
//! configured budget), and append the finished record to history.
//!
//! There is no global lock around `execute_task`; concurrently submitted
//! tasks proceed independently and only serialize inside the graph's own
//! commit. Every failure is folded into the returned [`TaskResult`]
//! instead of being thrown across the orchestration boundary.

use crate::config::RuntimeConfig;
use crate::history::TaskHistory;
use crate::registry::{AgentRegistry, AgentStatus};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskweave_core::{
    cancel_pair, Agent, CancelHandle, CancelToken, GraphError, Task, TaskError, TaskErrorKind,
    TaskId, TaskResult, ValidationError,
};
use taskweave_graph::MemoryGraph;

struct InflightTask {
    cancel: Arc<CancelHandle>,
    explicit: Arc<AtomicBool>,
}

/// How one execution attempt loop ended.
enum Finished {
    Completed {
        outputs: HashMap<String, serde_json::Value>,
        retries: u32,
    },
    Failed {
        kind: TaskErrorKind,
        message: String,
        retries: u32,
    },
    Cancelled {
        retries: u32,
    },
}

/// Executes tasks against registered agents and the shared memory graph.
pub struct TaskScheduler {
    graph: Arc<MemoryGraph>,
    registry: Arc<AgentRegistry>,
    config: RuntimeConfig,
    history: TaskHistory,
    inflight: DashMap<TaskId, InflightTask>,
}

impl TaskScheduler {
    /// Create a scheduler bound to a memory graph, with default config
    /// and a fresh registry.
    pub fn new(graph: Arc<MemoryGraph>) -> Self {
        Self::with_config(graph, RuntimeConfig::default())
    }

    /// Create a scheduler with explicit tunables.
    pub fn with_config(graph: Arc<MemoryGraph>, config: RuntimeConfig) -> Self {
        let registry = Arc::new(AgentRegistry::new(config.probe_timeout));
        Self {
            graph,
            registry,
            config,
            history: TaskHistory::new(),
            inflight: DashMap::new(),
        }
    }

    /// The registry owning agent identity, health, and availability.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// The shared memory graph this scheduler commits into.
    pub fn graph(&self) -> &Arc<MemoryGraph> {
        &self.graph
    }

    /// Immutable record of every task this scheduler has seen.
    pub fn history(&self) -> &TaskHistory {
        &self.history
    }

    /// Status of all registered agents, in stable order. Side-effect-free.
    pub fn agent_statuses(&self) -> Vec<AgentStatus> {
        self.registry.statuses()
    }

    /// Start the background health-probe loop at the configured cadence.
    pub fn spawn_probe_loop(&self) -> tokio::task::JoinHandle<()> {
        self.registry.spawn_probe_loop(self.config.probe_interval)
    }

    /// Raise the cancellation signal of an in-flight task. Returns `true`
    /// when a signal was delivered; the task finalizes as `cancelled`
    /// once its agent yields.
    pub fn cancel_task(&self, id: &TaskId) -> bool {
        match self.inflight.get(id) {
            Some(entry) => {
                entry.explicit.store(true, Ordering::SeqCst);
                entry.cancel.cancel();
                tracing::info!(task = %id, "cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Execute a task under the configured deadline.
    pub async fn execute_task(&self, task: Task) -> TaskResult {
        self.execute_task_with_deadline(task, self.config.task_timeout)
            .await
    }

    /// Execute a task with an explicit deadline covering the agent
    /// invocation and any conflict retries.
    pub async fn execute_task_with_deadline(
        &self,
        mut task: Task,
        deadline: Duration,
    ) -> TaskResult {
        let started = Instant::now();

        if let Err(err) = self.validate(&task) {
            return self.reject(
                task,
                started,
                TaskErrorKind::TaskValidationError,
                err.to_string(),
            );
        }

        let agent = match self.registry.resolve(&task.agent_id) {
            Ok(agent) => agent,
            Err(err) => {
                return self.reject(task, started, TaskErrorKind::AgentNotFound, err.to_string())
            }
        };

        if !self.registry.is_usable(&task.agent_id).unwrap_or(false) {
            let message = format!("agent '{}' is unhealthy or disabled", task.agent_id);
            return self.reject(task, started, TaskErrorKind::AgentUnavailable, message);
        }

        let (handle, token) = cancel_pair();
        let cancel = Arc::new(handle);
        let explicit = Arc::new(AtomicBool::new(false));
        match self.inflight.entry(task.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return self.reject(
                    task,
                    started,
                    TaskErrorKind::TaskValidationError,
                    "task id is already executing".to_string(),
                );
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(InflightTask {
                    cancel: Arc::clone(&cancel),
                    explicit: Arc::clone(&explicit),
                });
            }
        }

        // Validation guaranteed a pending task; this cannot fail.
        let _ = task.mark_running();
        tracing::info!(task = %task.id, agent = %task.agent_id, "task running");

        let finished = self
            .run_invocation_loop(&task, &agent, &cancel, token, &explicit, started, deadline)
            .await;
        self.inflight.remove(&task.id);
        self.finalize(task, started, finished)
    }

    fn validate(&self, task: &Task) -> Result<(), ValidationError> {
        if task.status != taskweave_core::TaskStatus::Pending {
            return Err(ValidationError::NotPending {
                id: task.id.clone(),
                status: task.status.to_string(),
            });
        }
        if task.progress != 0 {
            return Err(ValidationError::NonZeroProgress {
                id: task.id.clone(),
                progress: task.progress,
            });
        }
        if self.history.has_executed(&task.id) {
            return Err(ValidationError::DuplicateTask {
                id: task.id.clone(),
            });
        }
        Ok(())
    }

    /// Invoke the agent, commit its mutations, and retry the whole
    /// invocation on commit conflicts. One iteration per attempt.
    #[allow(clippy::too_many_arguments)]
    async fn run_invocation_loop(
        &self,
        task: &Task,
        agent: &Arc<dyn Agent>,
        cancel: &Arc<CancelHandle>,
        token: CancelToken,
        explicit: &Arc<AtomicBool>,
        started: Instant,
        deadline: Duration,
    ) -> Finished {
        let mut retries = 0u32;
        loop {
            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Finished::Failed {
                    kind: TaskErrorKind::TaskTimeout,
                    message: format!("execution exceeded deadline of {deadline:?}"),
                    retries,
                };
            }
            let remaining = deadline - elapsed;

            // Fresh view per attempt; a conflicted commit means the world
            // moved and the agent must re-derive its proposal.
            let snapshot = self.graph.snapshot();
            let mut invocation = agent.process(task, snapshot.clone(), token.clone());

            let agent_result = tokio::select! {
                result = &mut invocation => Some(result),
                _ = tokio::time::sleep(remaining) => {
                    cancel.cancel();
                    match tokio::time::timeout(self.config.cancel_grace, &mut invocation).await {
                        Ok(result) => Some(result),
                        Err(_) => None,
                    }
                }
            };

            let Some(agent_result) = agent_result else {
                // The agent never yielded within the grace period; the
                // invocation is abandoned so the task cannot leak.
                tracing::warn!(task = %task.id, "agent did not yield within grace period");
                return Finished::Failed {
                    kind: TaskErrorKind::TaskTimeout,
                    message: "agent did not yield within the cancellation grace period"
                        .to_string(),
                    retries,
                };
            };

            if explicit.load(Ordering::SeqCst) {
                return Finished::Cancelled { retries };
            }
            if cancel.is_cancelled() {
                return Finished::Failed {
                    kind: TaskErrorKind::TaskTimeout,
                    message: format!("execution exceeded deadline of {deadline:?}"),
                    retries,
                };
            }

            match agent_result {
                Ok(outcome) => {
                    // Commit even when no mutations were proposed; every
                    // successful task advances the graph version.
                    match self.graph.commit(snapshot.propose(outcome.mutations)) {
                        Ok(version) => {
                            tracing::debug!(task = %task.id, version, "mutations committed");
                            return Finished::Completed {
                                outputs: outcome.outputs,
                                retries,
                            };
                        }
                        Err(GraphError::MutationConflict { base, current }) => {
                            if retries >= self.config.max_commit_retries {
                                return Finished::Failed {
                                    kind: TaskErrorKind::MutationConflict,
                                    message: format!(
                                        "commit conflict persisted after {retries} retries \
                                         (base {base}, current {current})"
                                    ),
                                    retries,
                                };
                            }
                            retries += 1;
                            tracing::warn!(
                                task = %task.id,
                                retries,
                                base,
                                current,
                                "commit conflict, re-invoking agent"
                            );
                            tokio::time::sleep(self.config.backoff_for_attempt(retries)).await;
                        }
                        Err(err) => {
                            return Finished::Failed {
                                kind: TaskErrorKind::GraphIntegrityViolation,
                                message: err.to_string(),
                                retries,
                            };
                        }
                    }
                }
                Err(err) => {
                    return Finished::Failed {
                        kind: TaskErrorKind::AgentFailure,
                        message: err.to_string(),
                        retries,
                    };
                }
            }
        }
    }

    /// Record a pre-execution failure: the task record keeps its pending
    /// status (safe to resubmit) with the error attached for queryability.
    fn reject(
        &self,
        mut task: Task,
        started: Instant,
        kind: TaskErrorKind,
        message: String,
    ) -> TaskResult {
        tracing::warn!(task = %task.id, kind = %kind, %message, "task rejected");
        let error = TaskError::new(kind, message);
        task.error = Some(error.clone());
        self.history.record(task);
        TaskResult::failure(started.elapsed(), error, 0)
    }

    fn finalize(&self, mut task: Task, started: Instant, finished: Finished) -> TaskResult {
        let duration = started.elapsed();
        let result = match finished {
            Finished::Completed { outputs, retries } => {
                // The task is running here; these transitions cannot fail.
                let _ = task.mark_completed(outputs.clone());
                tracing::info!(task = %task.id, retries, "task completed");
                TaskResult::success(duration, outputs, retries)
            }
            Finished::Failed {
                kind,
                message,
                retries,
            } => {
                let error = TaskError::new(kind, message);
                let _ = task.mark_failed(error.clone());
                tracing::warn!(task = %task.id, kind = %kind, "task failed");
                TaskResult::failure(duration, error, retries)
            }
            Finished::Cancelled { retries } => {
                let _ = task.mark_cancelled();
                tracing::info!(task = %task.id, "task cancelled");
                let error = task.error.clone().unwrap_or_else(|| {
                    TaskError::new(TaskErrorKind::Cancelled, "task cancelled by caller")
                });
                TaskResult::failure(duration, error, retries)
            }
        };
        self.history.record(task);
        result
    }
}
