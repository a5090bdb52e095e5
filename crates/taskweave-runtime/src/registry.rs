//! Agent registry: identity, availability, and health.
//!
//! The registry is the single owner of per-agent status. Agents register
//! once at startup (duplicate registration is a configuration error, not
//! last-write-wins), can be disabled without being removed, and have
//! their health refreshed by on-demand or background probes. An agent is
//! usable only when it is both healthy and enabled.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use taskweave_core::{Agent, AgentId, RegistryError};

/// Point-in-time status of one registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: AgentId,
    pub is_healthy: bool,
    pub is_enabled: bool,
    pub last_heartbeat: DateTime<Utc>,
}

struct AgentEntry {
    agent: Arc<dyn Agent>,
    enabled: AtomicBool,
    healthy: AtomicBool,
    last_heartbeat: RwLock<DateTime<Utc>>,
}

impl AgentEntry {
    fn status(&self, id: &AgentId) -> AgentStatus {
        AgentStatus {
            agent_id: id.clone(),
            is_healthy: self.healthy.load(Ordering::SeqCst),
            is_enabled: self.enabled.load(Ordering::SeqCst),
            last_heartbeat: *self
                .last_heartbeat
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}

/// Tracks every registered agent and resolves ids to live instances.
pub struct AgentRegistry {
    agents: DashMap<AgentId, AgentEntry>,
    probe_timeout: Duration,
}

impl AgentRegistry {
    /// Create an empty registry. `probe_timeout` bounds each heartbeat.
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            agents: DashMap::new(),
            probe_timeout,
        }
    }

    /// Register an agent under an id. Registering the same id twice
    /// fails with [`RegistryError::DuplicateAgent`].
    pub fn register(&self, id: AgentId, agent: Arc<dyn Agent>) -> Result<(), RegistryError> {
        match self.agents.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::DuplicateAgent { id })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::info!(agent = %id, "agent registered");
                slot.insert(AgentEntry {
                    agent,
                    enabled: AtomicBool::new(true),
                    healthy: AtomicBool::new(true),
                    last_heartbeat: RwLock::new(Utc::now()),
                });
                Ok(())
            }
        }
    }

    /// Resolve an id to its live agent.
    pub fn resolve(&self, id: &AgentId) -> Result<Arc<dyn Agent>, RegistryError> {
        self.agents
            .get(id)
            .map(|entry| Arc::clone(&entry.agent))
            .ok_or_else(|| RegistryError::AgentNotFound { id: id.clone() })
    }

    /// Whether the agent is currently healthy and enabled.
    pub fn is_usable(&self, id: &AgentId) -> Result<bool, RegistryError> {
        let entry = self
            .agents
            .get(id)
            .ok_or_else(|| RegistryError::AgentNotFound { id: id.clone() })?;
        Ok(entry.enabled.load(Ordering::SeqCst) && entry.healthy.load(Ordering::SeqCst))
    }

    /// Toggle availability without removing the registration.
    pub fn set_enabled(&self, id: &AgentId, enabled: bool) -> Result<(), RegistryError> {
        let entry = self
            .agents
            .get(id)
            .ok_or_else(|| RegistryError::AgentNotFound { id: id.clone() })?;
        entry.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(agent = %id, enabled, "agent availability changed");
        Ok(())
    }

    /// Status of every registered agent, sorted by id for a stable order.
    pub fn statuses(&self) -> Vec<AgentStatus> {
        let mut statuses: Vec<AgentStatus> = self
            .agents
            .iter()
            .map(|entry| entry.value().status(entry.key()))
            .collect();
        statuses.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        statuses
    }

    /// Status of one agent.
    pub fn status(&self, id: &AgentId) -> Result<AgentStatus, RegistryError> {
        self.agents
            .get(id)
            .map(|entry| entry.status(id))
            .ok_or_else(|| RegistryError::AgentNotFound { id: id.clone() })
    }

    /// Probe one agent's heartbeat, updating its health and heartbeat
    /// timestamp. A probe that exceeds the timeout marks it unhealthy.
    pub async fn probe(&self, id: &AgentId) -> Result<bool, RegistryError> {
        let agent = self.resolve(id)?;
        let healthy = matches!(
            tokio::time::timeout(self.probe_timeout, agent.heartbeat()).await,
            Ok(true)
        );
        if let Some(entry) = self.agents.get(id) {
            entry.healthy.store(healthy, Ordering::SeqCst);
            *entry
                .last_heartbeat
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Utc::now();
        }
        if !healthy {
            tracing::warn!(agent = %id, "heartbeat probe failed");
        }
        Ok(healthy)
    }

    /// Probe every registered agent once.
    pub async fn probe_all(&self) {
        let ids: Vec<AgentId> = self.agents.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            // Unregistration does not exist, so resolve cannot fail here;
            // ignore rather than unwrap to stay panic-free.
            let _ = self.probe(&id).await;
        }
    }

    /// Run `probe_all` on a fixed cadence until the returned handle is
    /// aborted or the registry is dropped.
    pub fn spawn_probe_loop(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                registry.probe_all().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taskweave_core::{
        AgentError, AgentOutcome, CancelToken, GraphSnapshot, Task,
    };

    struct StubAgent {
        healthy: bool,
        slow_heartbeat: Option<Duration>,
    }

    impl StubAgent {
        fn healthy() -> Self {
            Self {
                healthy: true,
                slow_heartbeat: None,
            }
        }

        fn unhealthy() -> Self {
            Self {
                healthy: false,
                slow_heartbeat: None,
            }
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        async fn process(
            &self,
            _task: &Task,
            _graph: GraphSnapshot,
            _cancel: CancelToken,
        ) -> Result<AgentOutcome, AgentError> {
            Ok(AgentOutcome::empty())
        }

        async fn heartbeat(&self) -> bool {
            if let Some(delay) = self.slow_heartbeat {
                tokio::time::sleep(delay).await;
            }
            self.healthy
        }
    }

    fn id(s: &str) -> AgentId {
        AgentId::parse(s).unwrap()
    }

    fn registry() -> AgentRegistry {
        AgentRegistry::new(Duration::from_millis(100))
    }

    #[test]
    fn duplicate_registration_is_a_configuration_error() {
        let registry = registry();
        registry
            .register(id("planner"), Arc::new(StubAgent::healthy()))
            .unwrap();
        let err = registry
            .register(id("planner"), Arc::new(StubAgent::healthy()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAgent { .. }));
    }

    #[test]
    fn resolve_unknown_agent_fails() {
        let registry = registry();
        assert!(matches!(
            registry.resolve(&id("ghost")),
            Err(RegistryError::AgentNotFound { .. })
        ));
    }

    #[test]
    fn statuses_are_sorted_by_id() {
        let registry = registry();
        for name in ["deployer", "analyzer", "builder"] {
            registry
                .register(id(name), Arc::new(StubAgent::healthy()))
                .unwrap();
        }
        let statuses = registry.statuses();
        let ids: Vec<&str> = statuses.iter().map(|s| s.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["analyzer", "builder", "deployer"]);
    }

    #[test]
    fn disabling_makes_agent_unusable_but_keeps_registration() {
        let registry = registry();
        registry
            .register(id("builder"), Arc::new(StubAgent::healthy()))
            .unwrap();
        assert!(registry.is_usable(&id("builder")).unwrap());

        registry.set_enabled(&id("builder"), false).unwrap();
        assert!(!registry.is_usable(&id("builder")).unwrap());
        assert!(registry.resolve(&id("builder")).is_ok());

        registry.set_enabled(&id("builder"), true).unwrap();
        assert!(registry.is_usable(&id("builder")).unwrap());
    }

    #[tokio::test]
    async fn probe_updates_health_and_heartbeat() {
        let registry = registry();
        registry
            .register(id("flaky"), Arc::new(StubAgent::unhealthy()))
            .unwrap();
        let before = registry.status(&id("flaky")).unwrap().last_heartbeat;

        assert!(!registry.probe(&id("flaky")).await.unwrap());
        let status = registry.status(&id("flaky")).unwrap();
        assert!(!status.is_healthy);
        assert!(status.last_heartbeat >= before);
        assert!(!registry.is_usable(&id("flaky")).unwrap());
    }

    #[tokio::test]
    async fn slow_heartbeat_counts_as_unhealthy() {
        let registry = registry();
        registry
            .register(
                id("stuck"),
                Arc::new(StubAgent {
                    healthy: true,
                    slow_heartbeat: Some(Duration::from_secs(5)),
                }),
            )
            .unwrap();
        assert!(!registry.probe(&id("stuck")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_loop_refreshes_health_on_cadence() {
        let registry = Arc::new(registry());
        registry
            .register(id("flaky"), Arc::new(StubAgent::unhealthy()))
            .unwrap();
        assert!(registry.status(&id("flaky")).unwrap().is_healthy);

        let handle = registry.spawn_probe_loop(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!registry.status(&id("flaky")).unwrap().is_healthy);
        handle.abort();
    }

    #[tokio::test]
    async fn probe_all_covers_every_agent() {
        let registry = registry();
        registry
            .register(id("a"), Arc::new(StubAgent::healthy()))
            .unwrap();
        registry
            .register(id("b"), Arc::new(StubAgent::unhealthy()))
            .unwrap();
        registry.probe_all().await;
        let statuses = registry.statuses();
        assert!(statuses[0].is_healthy);
        assert!(!statuses[1].is_healthy);
    }
}
