//! In-process graph store backed by petgraph.
//!
//! Nodes live in a `StableGraph` with a HashMap index from store id to
//! petgraph's internal index. Ids are `n0, n1, …` in creation order and start
//! over after a flush.
//!
//! Each statement runs against a scratch copy of the graph which replaces the
//! live one only if the whole statement succeeded.

use crate::executor::{self, labels_contain, properties_contain, GraphWriter};
use async_trait::async_trait;
use kgqa_core::error::{StoreError, StoreResult};
use kgqa_core::statement::Statement;
use kgqa_core::store::GraphStore;
use kgqa_core::types::{EdgeRecord, NodeRecord, Properties, PropertyValue};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredNode {
    id: String,
    labels: Vec<String>,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    rel_type: String,
    properties: Properties,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    graph: StableGraph<StoredNode, StoredEdge>,
    index: HashMap<String, NodeIndex>,
    next_id: u64,
}

impl GraphState {
    fn lookup(&self, id: &str) -> StoreResult<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
    }

    fn record(&self, idx: NodeIndex) -> NodeRecord {
        let node = &self.graph[idx];
        NodeRecord::new(node.id.clone(), node.labels.clone(), node.properties.clone())
    }

    /// Nodes at exact undirected hop distance `radius` from `anchor`.
    fn layer(&self, anchor: NodeIndex, radius: usize) -> Vec<NodeIndex> {
        let mut depth: HashMap<NodeIndex, usize> = HashMap::from([(anchor, 0)]);
        let mut queue = VecDeque::from([anchor]);
        let mut layer = Vec::new();

        while let Some(idx) = queue.pop_front() {
            let d = depth[&idx];
            if d == radius {
                layer.push(idx);
                continue;
            }
            for next in self.graph.neighbors_undirected(idx) {
                if !depth.contains_key(&next) {
                    depth.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }

        layer.sort();
        layer
    }
}

impl GraphWriter for GraphState {
    fn find_nodes(&self, labels: &[String], properties: &Properties) -> StoreResult<Vec<String>> {
        Ok(self
            .graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .filter(|n| labels_contain(&n.labels, labels) && properties_contain(&n.properties, properties))
            .map(|n| n.id.clone())
            .collect())
    }

    fn node_matches(&self, id: &str, labels: &[String], properties: &Properties) -> StoreResult<bool> {
        let node = &self.graph[self.lookup(id)?];
        Ok(labels_contain(&node.labels, labels) && properties_contain(&node.properties, properties))
    }

    fn create_node(&mut self, labels: &[String], properties: &Properties) -> StoreResult<String> {
        let id = format!("n{}", self.next_id);
        self.next_id += 1;
        let idx = self.graph.add_node(StoredNode {
            id: id.clone(),
            labels: labels.to_vec(),
            properties: properties.clone(),
        });
        self.index.insert(id.clone(), idx);
        Ok(id)
    }

    fn has_edge(
        &self,
        source: &str,
        target: &str,
        rel_type: Option<&str>,
        properties: &Properties,
    ) -> StoreResult<bool> {
        let from = self.lookup(source)?;
        let to = self.lookup(target)?;
        Ok(self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to)
            .any(|e| {
                let edge = e.weight();
                rel_type.map_or(true, |t| edge.rel_type == t)
                    && properties_contain(&edge.properties, properties)
            }))
    }

    fn create_edge(
        &mut self,
        source: &str,
        target: &str,
        rel_type: &str,
        properties: &Properties,
    ) -> StoreResult<()> {
        let from = self.lookup(source)?;
        let to = self.lookup(target)?;
        self.graph.add_edge(
            from,
            to,
            StoredEdge {
                rel_type: rel_type.to_string(),
                properties: properties.clone(),
            },
        );
        Ok(())
    }

    fn set_property(&mut self, id: &str, key: &str, value: &PropertyValue) -> StoreResult<()> {
        let idx = self.lookup(id)?;
        self.graph[idx]
            .properties
            .insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Petgraph-backed [`GraphStore`].
///
/// `disconnect` drops the graph; later calls fail with
/// [`StoreError::Disconnected`].
pub struct MemoryGraphStore {
    state: RwLock<Option<GraphState>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Some(GraphState::default())),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&GraphState) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))?;
        let state = guard.as_ref().ok_or(StoreError::Disconnected)?;
        f(state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Option<GraphState>) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))?;
        if guard.is_none() {
            return Err(StoreError::Disconnected);
        }
        f(&mut guard)
    }

    /// Edge count, for diagnostics.
    pub fn edge_count(&self) -> StoreResult<usize> {
        self.read(|s| Ok(s.graph.edge_count()))
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        let parsed = Statement::parse(statement)?;
        self.write(|slot| {
            let Some(live) = slot.as_ref() else {
                return Err(StoreError::Disconnected);
            };
            let mut scratch = live.clone();
            executor::apply(&mut scratch, &parsed)?;
            debug!(
                nodes = scratch.graph.node_count(),
                edges = scratch.graph.edge_count(),
                "Statement applied"
            );
            *slot = Some(scratch);
            Ok(())
        })
    }

    async fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        self.read(|s| Ok(s.graph.node_indices().map(|idx| s.record(idx)).collect()))
    }

    async fn list_edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        self.read(|s| {
            Ok(s.graph
                .edge_references()
                .map(|e| EdgeRecord {
                    source: s.graph[e.source()].id.clone(),
                    target: s.graph[e.target()].id.clone(),
                    rel_type: e.weight().rel_type.clone(),
                    properties: e.weight().properties.clone(),
                })
                .collect())
        })
    }

    async fn list_neighbors(&self, anchor_id: &str, radius: usize) -> StoreResult<Vec<NodeRecord>> {
        if radius == 0 {
            return Err(StoreError::InvalidRadius(radius));
        }
        self.read(|s| {
            let anchor = s.lookup(anchor_id)?;
            Ok(s.layer(anchor, radius)
                .into_iter()
                .map(|idx| s.record(idx))
                .collect())
        })
    }

    async fn flush(&self) -> StoreResult<()> {
        self.write(|slot| {
            *slot = Some(GraphState::default());
            Ok(())
        })
    }

    async fn disconnect(&self) -> StoreResult<()> {
        self.write(|slot| {
            *slot = None;
            Ok(())
        })
    }

    async fn node_count(&self) -> StoreResult<usize> {
        self.read(|s| Ok(s.graph.node_count()))
    }
}
