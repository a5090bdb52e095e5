//! # Taskweave Graph
//!
//! The shared versioned knowledge store of the runtime. Nodes and edges
//! are addressed by stable ids; all writes flow through an optimistic
//! propose/commit protocol validated against a base version, so no agent
//! or scheduler ever holds a graph-wide lock across an agent invocation.
//!
//! - [`MemoryGraph::snapshot`] — cheap, immutable, consistent read view
//! - [`MemoryGraph::propose`] / [`MemoryGraph::commit`] — all-or-nothing
//!   change-set application with conflict detection
//! - [`MemoryGraph::query`] — lazy, restartable pattern matching
//! - [`MemoryGraph::subscribe`] — commit notifications filtered by
//!   node/edge type

mod store;
mod subscribe;

pub use store::{MemoryGraph, QueryResults};
pub use subscribe::{GraphEvent, GraphSubscription, TypeInterest};

pub use taskweave_core::graph::{
    ChangeSet, EdgeKey, GraphSnapshot, MemoryEdge, MemoryNode, Mutation, QueryMatch, QueryPattern,
};
pub use taskweave_core::GraphError;
