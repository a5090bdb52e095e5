//! Analyzer: read-only report over the graph snapshot.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use taskweave_core::{Agent, AgentError, AgentOutcome, CancelToken, GraphSnapshot, Task};

/// Walks the snapshot and reports node/edge counts per type plus a
/// dangling-reference audit. Proposes no mutations; the runtime still
/// commits an empty batch, so the report is causally ordered with writes.
#[derive(Debug, Default)]
pub struct AnalyzerAgent;

impl AnalyzerAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for AnalyzerAgent {
    async fn process(
        &self,
        _task: &Task,
        graph: GraphSnapshot,
        cancel: CancelToken,
    ) -> Result<AgentOutcome, AgentError> {
        let mut node_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in graph.nodes() {
            *node_counts.entry(node.node_type.as_str()).or_default() += 1;
        }
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let mut edge_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dangling: Vec<String> = Vec::new();
        for edge in graph.edges() {
            *edge_counts.entry(edge.edge_type.as_str()).or_default() += 1;
            if !graph.contains_node(&edge.from) || !graph.contains_node(&edge.to) {
                dangling.push(format!("{} -> {}", edge.from, edge.to));
            }
        }

        Ok(AgentOutcome::empty()
            .with_output("graph_version", json!(graph.version()))
            .with_output("total_nodes", json!(graph.node_count()))
            .with_output("total_edges", json!(graph.edge_count()))
            .with_output("node_counts", json!(node_counts))
            .with_output("edge_counts", json!(edge_counts))
            .with_output("dangling_edges", json!(dangling)))
    }
}
