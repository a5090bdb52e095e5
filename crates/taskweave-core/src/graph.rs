//! Data types for the versioned memory graph.
//!
//! This module defines the pure data side of the graph: nodes, edges,
//! mutations, change-sets, and the immutable [`GraphSnapshot`] read view.
//! The concurrent store that applies change-sets lives in the
//! `taskweave-graph` crate; agents only ever see these types.
//!
//! Snapshots are copy-on-write: they share node and edge tables with the
//! store through `Arc`, so taking one is cheap and it stays consistent
//! no matter how many commits land after it was taken.

use crate::identifiers::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A typed node in the memory graph.
///
/// `data` is an opaque payload owned by whichever agent produced the node;
/// the graph itself only interprets `id` and `node_type`. `version` is the
/// node-local revision, bumped every time a `PutNode` overwrites the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub data: serde_json::Value,
    pub version: u64,
}

/// A typed directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEdge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl MemoryEdge {
    /// Create an edge with empty metadata.
    pub fn new(from: NodeId, to: NodeId, edge_type: impl Into<String>) -> Self {
        Self {
            from,
            to,
            edge_type: edge_type.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The identity of this edge within the graph.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from.clone(),
            to: self.to.clone(),
            edge_type: self.edge_type.clone(),
        }
    }
}

/// Identity of an edge: endpoints plus type. The graph stores at most one
/// edge per key, so re-putting an existing edge replaces its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub edge_type: String,
}

/// A single proposed graph edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert a node, or overwrite it (bumping its node-local version).
    PutNode {
        id: NodeId,
        #[serde(rename = "type")]
        node_type: String,
        data: serde_json::Value,
    },
    /// Remove a node. Rejected while edges still reference it.
    RemoveNode { id: NodeId },
    /// Insert or replace an edge.
    PutEdge { edge: MemoryEdge },
    /// Remove an edge by identity.
    RemoveEdge { key: EdgeKey },
}

impl Mutation {
    /// Convenience constructor for `PutNode`.
    pub fn put_node(
        id: NodeId,
        node_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Mutation::PutNode {
            id,
            node_type: node_type.into(),
            data,
        }
    }

    /// Convenience constructor for `PutEdge`.
    pub fn put_edge(from: NodeId, to: NodeId, edge_type: impl Into<String>) -> Self {
        Mutation::PutEdge {
            edge: MemoryEdge::new(from, to, edge_type),
        }
    }

    /// The node type touched by this mutation, if any.
    pub fn node_type(&self) -> Option<&str> {
        match self {
            Mutation::PutNode { node_type, .. } => Some(node_type),
            _ => None,
        }
    }

    /// The edge type touched by this mutation, if any.
    pub fn edge_type(&self) -> Option<&str> {
        match self {
            Mutation::PutEdge { edge } => Some(&edge.edge_type),
            Mutation::RemoveEdge { key } => Some(&key.edge_type),
            _ => None,
        }
    }
}

/// A proposed, not-yet-committed batch of mutations tied to the graph
/// version its author read. Commit succeeds only while the graph is still
/// at that base version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    base_version: u64,
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    /// Build a change-set against a known base version. Callers normally
    /// go through [`GraphSnapshot::propose`] instead.
    pub fn new(base_version: u64, mutations: Vec<Mutation>) -> Self {
        Self {
            base_version,
            mutations,
        }
    }

    /// The graph version this batch was read against.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// The proposed edits, in application order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Whether the batch proposes no edits at all.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Pattern for [`GraphSnapshot::query`]. Empty pattern matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

impl QueryPattern {
    /// Match nodes of one type.
    pub fn nodes_of_type(node_type: impl Into<String>) -> Self {
        Self {
            node_type: Some(node_type.into()),
            ..Self::default()
        }
    }

    /// Match edges of one type.
    pub fn edges_of_type(edge_type: impl Into<String>) -> Self {
        Self {
            edge_type: Some(edge_type.into()),
            ..Self::default()
        }
    }

    /// Restrict node matches to a single id.
    pub fn with_node_id(mut self, id: NodeId) -> Self {
        self.node_id = Some(id);
        self
    }
}

/// One element of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryMatch<'a> {
    Node(&'a MemoryNode),
    Edge(&'a MemoryEdge),
}

/// Immutable, consistent read view of the graph at one version.
///
/// Cloning a snapshot is cheap (two `Arc` bumps); iterating it never
/// observes later commits.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    version: u64,
    nodes: Arc<HashMap<NodeId, MemoryNode>>,
    edges: Arc<HashMap<EdgeKey, MemoryEdge>>,
}

impl GraphSnapshot {
    /// Assemble a snapshot from shared tables. Used by the store; agents
    /// receive snapshots, they do not build them.
    pub fn from_parts(
        version: u64,
        nodes: Arc<HashMap<NodeId, MemoryNode>>,
        edges: Arc<HashMap<EdgeKey, MemoryEdge>>,
    ) -> Self {
        Self {
            version,
            nodes,
            edges,
        }
    }

    /// An empty snapshot at version 0.
    pub fn empty() -> Self {
        Self::from_parts(0, Arc::new(HashMap::new()), Arc::new(HashMap::new()))
    }

    /// The graph version this view was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    /// Whether the node exists in this view.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes, in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &MemoryNode> {
        self.nodes.values()
    }

    /// All edges, in unspecified order.
    pub fn edges(&self) -> impl Iterator<Item = &MemoryEdge> {
        self.edges.values()
    }

    /// Number of nodes in this view.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in this view.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving the given node.
    pub fn edges_from<'a>(
        &'a self,
        id: &'a NodeId,
    ) -> impl Iterator<Item = &'a MemoryEdge> + 'a {
        self.edges.values().filter(move |e| &e.from == id)
    }

    /// Lazy, finite query over this view. Restartable by calling again
    /// with the same pattern; the view never changes underneath it.
    pub fn query<'a>(
        &'a self,
        pattern: &'a QueryPattern,
    ) -> impl Iterator<Item = QueryMatch<'a>> + 'a {
        let want_nodes = pattern.edge_type.is_none();
        let want_edges = pattern.node_type.is_none();
        let nodes = self
            .nodes
            .values()
            .filter(move |n| {
                want_nodes
                    && pattern
                        .node_type
                        .as_deref()
                        .is_none_or(|t| n.node_type == t)
                    && pattern.node_id.as_ref().is_none_or(|id| &n.id == id)
            })
            .map(QueryMatch::Node);
        let edges = self
            .edges
            .values()
            .filter(move |e| {
                want_edges
                    && pattern
                        .edge_type
                        .as_deref()
                        .is_none_or(|t| e.edge_type == t)
                    && pattern
                        .node_id
                        .as_ref()
                        .is_none_or(|id| &e.from == id || &e.to == id)
            })
            .map(QueryMatch::Edge);
        nodes.chain(edges)
    }

    /// Tie a batch of proposed mutations to this view's version.
    pub fn propose(&self, mutations: Vec<Mutation>) -> ChangeSet {
        ChangeSet::new(self.version, mutations)
    }
}
