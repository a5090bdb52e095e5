//! The concurrent versioned store.
//!
//! Internally the graph keeps its node and edge tables behind `Arc`s and
//! swaps whole tables on commit. Snapshots therefore share storage with
//! the live graph (copy-on-write), and the write lock is held only for
//! the duration of applying one change-set, never across agent work.

use crate::subscribe::{GraphEvent, GraphSubscription, TypeInterest};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taskweave_core::graph::{
    ChangeSet, EdgeKey, GraphSnapshot, MemoryEdge, MemoryNode, Mutation, QueryMatch, QueryPattern,
};
use taskweave_core::identifiers::NodeId;
use taskweave_core::GraphError;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct GraphState {
    version: u64,
    nodes: Arc<HashMap<NodeId, MemoryNode>>,
    edges: Arc<HashMap<EdgeKey, MemoryEdge>>,
}

/// The shared versioned knowledge store.
///
/// All methods take `&self`; the runtime shares one instance behind an
/// `Arc`. The global version starts at 0 and increases by exactly one per
/// committed change-set.
pub struct MemoryGraph {
    state: RwLock<GraphState>,
    events: broadcast::Sender<GraphEvent>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    /// Create an empty graph at version 0.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(GraphState {
                version: 0,
                nodes: Arc::new(HashMap::new()),
                edges: Arc::new(HashMap::new()),
            }),
            events,
        }
    }

    // A poisoned lock still holds consistent data: commits build fresh
    // tables first and only then swap them in, so recovery is safe.
    fn read_state(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current global version.
    pub fn version(&self) -> u64 {
        self.read_state().version
    }

    /// Take an immutable, consistent read view. Cheap; usable
    /// concurrently with ongoing commits.
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.read_state();
        GraphSnapshot::from_parts(
            state.version,
            Arc::clone(&state.nodes),
            Arc::clone(&state.edges),
        )
    }

    /// Tie a batch of mutations to the current version. Equivalent to
    /// `self.snapshot().propose(mutations)`.
    pub fn propose(&self, mutations: Vec<Mutation>) -> ChangeSet {
        self.snapshot().propose(mutations)
    }

    /// Atomically apply a change-set.
    ///
    /// Fails with [`GraphError::MutationConflict`] when the graph version
    /// moved past the change-set's base version, and with
    /// [`GraphError::IntegrityViolation`] (or [`GraphError::NodeInUse`])
    /// when the batch would leave a dangling edge. Either way the graph
    /// is left untouched; a batch is never partially applied.
    ///
    /// Returns the new version on success.
    pub fn commit(&self, changeset: ChangeSet) -> Result<u64, GraphError> {
        let mut state = self.write_state();
        if state.version != changeset.base_version() {
            return Err(GraphError::MutationConflict {
                base: changeset.base_version(),
                current: state.version,
            });
        }

        let mut nodes = (*state.nodes).clone();
        let mut edges = (*state.edges).clone();
        let mut node_types = BTreeSet::new();
        let mut edge_types = BTreeSet::new();

        for mutation in changeset.mutations() {
            // A removal carries no type of its own; resolve it from the
            // table before the node disappears so type-filtered
            // subscribers hear about removals too.
            if let Mutation::RemoveNode { id } = mutation {
                if let Some(node) = nodes.get(id) {
                    node_types.insert(node.node_type.clone());
                }
            }
            apply(&mut nodes, &mut edges, mutation)?;
            if let Some(t) = mutation.node_type() {
                node_types.insert(t.to_string());
            }
            if let Some(t) = mutation.edge_type() {
                edge_types.insert(t.to_string());
            }
        }

        // Referential integrity over the final state of the batch; edges
        // may be put before their endpoints within the same batch.
        for edge in edges.values() {
            if !nodes.contains_key(&edge.from) || !nodes.contains_key(&edge.to) {
                return Err(GraphError::IntegrityViolation {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            }
        }

        state.version += 1;
        state.nodes = Arc::new(nodes);
        state.edges = Arc::new(edges);

        let version = state.version;
        tracing::debug!(
            version,
            mutations = changeset.mutations().len(),
            "graph commit applied"
        );

        // Nobody listening is fine.
        let _ = self.events.send(GraphEvent {
            version,
            node_types,
            edge_types,
        });

        Ok(version)
    }

    /// Lazy, finite, restartable query over a snapshot taken at call time.
    pub fn query(&self, pattern: QueryPattern) -> QueryResults {
        QueryResults {
            snapshot: self.snapshot(),
            pattern,
        }
    }

    /// Register interest in commits touching the given node/edge types.
    pub fn subscribe(&self, interest: TypeInterest) -> GraphSubscription {
        GraphSubscription {
            rx: self.events.subscribe(),
            interest,
        }
    }
}

fn apply(
    nodes: &mut HashMap<NodeId, MemoryNode>,
    edges: &mut HashMap<EdgeKey, MemoryEdge>,
    mutation: &Mutation,
) -> Result<(), GraphError> {
    match mutation {
        Mutation::PutNode {
            id,
            node_type,
            data,
        } => {
            let version = nodes.get(id).map(|n| n.version + 1).unwrap_or(1);
            nodes.insert(
                id.clone(),
                MemoryNode {
                    id: id.clone(),
                    node_type: node_type.clone(),
                    data: data.clone(),
                    version,
                },
            );
        }
        Mutation::RemoveNode { id } => {
            // Edges referencing the node must be removed earlier in the
            // same batch; mutations apply in order.
            let edge_count = edges
                .values()
                .filter(|e| &e.from == id || &e.to == id)
                .count();
            if edge_count > 0 {
                return Err(GraphError::NodeInUse {
                    id: id.clone(),
                    edge_count,
                });
            }
            nodes.remove(id);
        }
        Mutation::PutEdge { edge } => {
            edges.insert(edge.key(), edge.clone());
        }
        Mutation::RemoveEdge { key } => {
            edges.remove(key);
        }
    }
    Ok(())
}

/// Owned query handle over one consistent snapshot. Restartable: every
/// call to [`QueryResults::iter`] walks the same view from the start.
pub struct QueryResults {
    snapshot: GraphSnapshot,
    pattern: QueryPattern,
}

impl QueryResults {
    /// Iterate the matches lazily.
    pub fn iter(&self) -> impl Iterator<Item = QueryMatch<'_>> + '_ {
        self.snapshot.query(&self.pattern)
    }

    /// The version of the view being queried.
    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    fn put(graph: &MemoryGraph, node: &str, node_type: &str) {
        let cs = graph.propose(vec![Mutation::put_node(id(node), node_type, json!({}))]);
        graph.commit(cs).unwrap();
    }

    #[test]
    fn commit_bumps_version_by_one() {
        let graph = MemoryGraph::new();
        assert_eq!(graph.version(), 0);
        put(&graph, "a", "intent");
        assert_eq!(graph.version(), 1);
        put(&graph, "b", "file");
        assert_eq!(graph.version(), 2);
    }

    #[test]
    fn stale_base_version_conflicts() {
        let graph = MemoryGraph::new();
        let stale = graph.propose(vec![Mutation::put_node(id("a"), "intent", json!({}))]);
        put(&graph, "b", "file");
        let err = graph.commit(stale).unwrap_err();
        assert_eq!(err, GraphError::MutationConflict { base: 0, current: 1 });
        // The losing write left no trace.
        assert!(graph.snapshot().node(&id("a")).is_none());
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let graph = MemoryGraph::new();
        put(&graph, "a", "intent");
        let snap = graph.snapshot();
        put(&graph, "b", "file");
        assert_eq!(snap.version(), 1);
        assert!(snap.node(&id("b")).is_none());
        assert!(graph.snapshot().node(&id("b")).is_some());
    }

    #[test]
    fn dangling_edge_aborts_whole_commit() {
        let graph = MemoryGraph::new();
        put(&graph, "a", "intent");
        let cs = graph.propose(vec![
            Mutation::put_node(id("x"), "file", json!({})),
            Mutation::put_edge(id("a"), id("missing"), "contains"),
        ]);
        let err = graph.commit(cs).unwrap_err();
        assert!(matches!(err, GraphError::IntegrityViolation { .. }));
        // All-or-nothing: the valid node from the same batch is gone too.
        assert!(graph.snapshot().node(&id("x")).is_none());
        assert_eq!(graph.version(), 1);
    }

    #[test]
    fn edge_may_precede_its_endpoints_within_a_batch() {
        let graph = MemoryGraph::new();
        let cs = graph.propose(vec![
            Mutation::put_edge(id("a"), id("b"), "contains"),
            Mutation::put_node(id("a"), "component", json!({})),
            Mutation::put_node(id("b"), "file", json!({})),
        ]);
        graph.commit(cs).unwrap();
        assert_eq!(graph.snapshot().edge_count(), 1);
    }

    #[test]
    fn removing_referenced_node_is_rejected() {
        let graph = MemoryGraph::new();
        let cs = graph.propose(vec![
            Mutation::put_node(id("a"), "component", json!({})),
            Mutation::put_node(id("b"), "file", json!({})),
            Mutation::put_edge(id("a"), id("b"), "contains"),
        ]);
        graph.commit(cs).unwrap();

        let cs = graph.propose(vec![Mutation::RemoveNode { id: id("b") }]);
        let err = graph.commit(cs).unwrap_err();
        assert!(matches!(err, GraphError::NodeInUse { edge_count: 1, .. }));

        // Removing the edge first in the same batch succeeds.
        let cs = graph.propose(vec![
            Mutation::RemoveEdge {
                key: EdgeKey {
                    from: id("a"),
                    to: id("b"),
                    edge_type: "contains".to_string(),
                },
            },
            Mutation::RemoveNode { id: id("b") },
        ]);
        graph.commit(cs).unwrap();
        assert!(graph.snapshot().node(&id("b")).is_none());
    }

    #[test]
    fn put_node_bumps_node_local_version() {
        let graph = MemoryGraph::new();
        put(&graph, "a", "intent");
        let cs = graph.propose(vec![Mutation::put_node(
            id("a"),
            "intent",
            json!({"goal": "updated"}),
        )]);
        graph.commit(cs).unwrap();
        assert_eq!(graph.snapshot().node(&id("a")).unwrap().version, 2);
    }

    #[test]
    fn duplicate_edge_key_keeps_one_edge() {
        let graph = MemoryGraph::new();
        let cs = graph.propose(vec![
            Mutation::put_node(id("a"), "component", json!({})),
            Mutation::put_node(id("b"), "file", json!({})),
            Mutation::put_edge(id("a"), id("b"), "contains"),
            Mutation::put_edge(id("a"), id("b"), "contains"),
        ]);
        graph.commit(cs).unwrap();
        assert_eq!(graph.snapshot().edge_count(), 1);
    }

    #[test]
    fn query_handle_is_restartable() {
        let graph = MemoryGraph::new();
        put(&graph, "a", "intent");
        put(&graph, "b", "intent");
        let results = graph.query(QueryPattern::nodes_of_type("intent"));
        assert_eq!(results.iter().count(), 2);
        assert_eq!(results.iter().count(), 2);
        // Later commits do not leak into the handle.
        put(&graph, "c", "intent");
        assert_eq!(results.iter().count(), 2);
    }

    #[tokio::test]
    async fn node_removal_notifies_type_subscribers() {
        let graph = MemoryGraph::new();
        put(&graph, "a", "file");
        let mut sub = graph.subscribe(TypeInterest::default().with_node_type("file"));

        let cs = graph.propose(vec![Mutation::RemoveNode { id: id("a") }]);
        graph.commit(cs).unwrap();

        let event = sub.recv().await.expect("graph still alive");
        assert_eq!(event.version, 2);
        assert!(event.node_types.contains("file"));
    }

    #[tokio::test]
    async fn subscribers_see_matching_commits_only() {
        let graph = MemoryGraph::new();
        let mut sub = graph.subscribe(TypeInterest::default().with_node_type("intent"));

        put(&graph, "f", "file");
        put(&graph, "i", "intent");

        let event = sub.recv().await.expect("graph still alive");
        assert_eq!(event.version, 2);
        assert!(event.node_types.contains("intent"));
        assert!(sub.try_recv().is_none());
    }
}
