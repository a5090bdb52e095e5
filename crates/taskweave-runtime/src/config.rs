//! Runtime configuration.
//!
//! Durations deserialize from humantime strings (`"30s"`, `"250ms"`), so
//! a config file can carry `task_timeout = "45s"` directly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the scheduler and the registry's health probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deadline for one `execute_task` call, covering the agent
    /// invocation and commit retries.
    #[serde(with = "duration_str")]
    pub task_timeout: Duration,

    /// How long to wait for an agent to yield after its cancellation
    /// signal is raised before the task is force-finalized.
    #[serde(with = "duration_str")]
    pub cancel_grace: Duration,

    /// Number of full agent re-invocations allowed after a commit
    /// conflict before the conflict is surfaced to the caller.
    pub max_commit_retries: u32,

    /// Base backoff between conflict retries; doubles per attempt.
    #[serde(with = "duration_str")]
    pub retry_backoff: Duration,

    /// Deadline for one heartbeat probe.
    #[serde(with = "duration_str")]
    pub probe_timeout: Duration,

    /// Cadence of the background probe loop, when spawned.
    #[serde(with = "duration_str")]
    pub probe_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_timeout: Duration::from_secs(30),
            cancel_grace: Duration::from_secs(2),
            max_commit_retries: 3,
            retry_backoff: Duration::from_millis(25),
            probe_timeout: Duration::from_secs(1),
            probe_interval: Duration::from_secs(30),
        }
    }
}

impl RuntimeConfig {
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Backoff before retry number `attempt` (1-based), doubling each time.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
