//! Commit notifications.
//!
//! Subscribers declare interest in node/edge types and receive one event
//! per successful commit that touches any of those types. Events carry
//! the committed version plus the touched types, not the data itself;
//! interested parties take a fresh snapshot, which is guaranteed to be at
//! least as new as the event's version.

use std::collections::BTreeSet;
use tokio::sync::broadcast;

/// Notification emitted after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEvent {
    /// The version the commit produced.
    pub version: u64,
    /// Node types touched by the committed batch.
    pub node_types: BTreeSet<String>,
    /// Edge types touched by the committed batch.
    pub edge_types: BTreeSet<String>,
}

impl GraphEvent {
    /// Whether this event touches anything the interest covers.
    pub fn matches(&self, interest: &TypeInterest) -> bool {
        if interest.is_catch_all() {
            return true;
        }
        self.node_types
            .iter()
            .any(|t| interest.node_types.contains(t))
            || self
                .edge_types
                .iter()
                .any(|t| interest.edge_types.contains(t))
    }
}

/// Which node/edge types a subscriber cares about. An empty interest is
/// a catch-all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInterest {
    pub node_types: BTreeSet<String>,
    pub edge_types: BTreeSet<String>,
}

impl TypeInterest {
    /// Interest in every commit.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_types.insert(node_type.into());
        self
    }

    pub fn with_edge_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_types.insert(edge_type.into());
        self
    }

    fn is_catch_all(&self) -> bool {
        self.node_types.is_empty() && self.edge_types.is_empty()
    }
}

/// Receiving half of a subscription, filtered by [`TypeInterest`].
pub struct GraphSubscription {
    pub(crate) rx: broadcast::Receiver<GraphEvent>,
    pub(crate) interest: TypeInterest,
}

impl GraphSubscription {
    /// Wait for the next matching commit. Returns `None` once the graph
    /// is dropped. A slow subscriber that falls behind the channel skips
    /// the missed events and keeps receiving newer ones.
    pub async fn recv(&mut self) -> Option<GraphEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.matches(&self.interest) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "graph subscriber lagged, skipping events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain any already-delivered matching event without waiting.
    pub fn try_recv(&mut self) -> Option<GraphEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.matches(&self.interest) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
