//! Graph store: the property-graph backend the pipeline reads and writes.
//!
//! This is a trait rather than a concrete type so that the builder and the
//! retrieval loop can run against Neo4j, SQLite or an in-process graph, and so
//! tests can hand collaborators an isolated fake.
//!
//! A store value is one logical session: connect, operate, [`GraphStore::disconnect`].
//! After disconnecting every call fails with [`StoreError::Disconnected`].
//!
//! [`StoreError::Disconnected`]: crate::error::StoreError::Disconnected

use crate::error::StoreResult;
use crate::types::{EdgeRecord, NodeRecord};
use async_trait::async_trait;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend name, for logs.
    fn name(&self) -> &str;

    /// Run one mutation statement in the store's query language.
    ///
    /// A failed statement leaves the graph unchanged.
    async fn execute(&self, statement: &str) -> StoreResult<()>;

    /// Full node inventory.
    async fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>>;

    /// Full edge inventory.
    async fn list_edges(&self) -> StoreResult<Vec<EdgeRecord>>;

    /// Nodes whose shortest undirected hop distance from `anchor_id` is exactly `radius`.
    ///
    /// The result is the layer *at* that depth, not everything within it, and
    /// never contains the anchor itself.
    async fn list_neighbors(&self, anchor_id: &str, radius: usize)
        -> StoreResult<Vec<NodeRecord>>;

    /// Detach and delete every node and edge.
    async fn flush(&self) -> StoreResult<()>;

    /// Release the underlying connection.
    async fn disconnect(&self) -> StoreResult<()>;

    /// Number of nodes currently stored.
    async fn node_count(&self) -> StoreResult<usize> {
        Ok(self.list_nodes().await?.len())
    }
}
