//! Neo4j graph store over the Bolt protocol.
//!
//! Statements are sent to the server unchanged. Node ids are
//! `elementId(n)`; neighbor layers use `shortestPath` so a node is reported
//! at its shortest distance from the anchor only.

#![cfg(feature = "neo4j")]

use async_trait::async_trait;
use kgqa_core::error::{StoreError, StoreResult};
use kgqa_core::store::GraphStore;
use kgqa_core::types::{EdgeRecord, NodeRecord, Properties, PropertyValue};
use neo4rs::{query, Graph, Query};
use std::sync::RwLock;
use tracing::{debug, info};

/// Connection settings for [`Neo4jGraphStore`].
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Neo4j-backed [`GraphStore`].
pub struct Neo4jGraphStore {
    graph: RwLock<Option<Graph>>,
    uri: String,
}

impl Neo4jGraphStore {
    /// Open a session against the configured server.
    pub async fn connect(config: &Neo4jConfig) -> StoreResult<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|e| StoreError::Connection(format!("{}: {}", config.uri, e)))?;
        info!(uri = %config.uri, "Connected to Neo4j");

        Ok(Self {
            graph: RwLock::new(Some(graph)),
            uri: config.uri.clone(),
        })
    }

    /// Server URI this session talks to.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn session(&self) -> StoreResult<Graph> {
        self.graph
            .read()
            .map_err(|_| StoreError::backend("neo4j session lock poisoned"))?
            .clone()
            .ok_or(StoreError::Disconnected)
    }

    async fn fetch_nodes(&self, q: Query) -> StoreResult<Vec<NodeRecord>> {
        let graph = self.session()?;
        let mut stream = graph.execute(q).await.map_err(classify)?;
        let mut nodes = Vec::new();
        while let Some(row) = stream.next().await.map_err(classify)? {
            let id: String = row.get("id").map_err(StoreError::backend)?;
            let node: neo4rs::Node = row.get("n").map_err(StoreError::backend)?;
            let labels = node.labels().into_iter().map(|l| l.to_string()).collect();
            nodes.push(NodeRecord::new(id, labels, read_properties(&node)));
        }
        Ok(nodes)
    }

    async fn anchor_exists(&self, anchor_id: &str) -> StoreResult<bool> {
        let graph = self.session()?;
        let q = query("MATCH (a) WHERE elementId(a) = $id RETURN count(a) AS c").param("id", anchor_id);
        let mut stream = graph.execute(q).await.map_err(classify)?;
        match stream.next().await.map_err(classify)? {
            Some(row) => count_is_positive(row.get::<i64>("c")),
            None => Ok(false),
        }
    }
}

/// Map a driver error onto the store taxonomy.
fn classify(e: neo4rs::Error) -> StoreError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if msg.contains("SyntaxError") {
        StoreError::Syntax(msg)
    } else if lower.contains("connection") || lower.contains("io error") {
        StoreError::Connection(msg)
    } else {
        StoreError::Execution(msg)
    }
}

fn count_is_positive<E: std::fmt::Display>(count: Result<i64, E>) -> StoreResult<bool> {
    count.map(|c| c > 0).map_err(StoreError::backend)
}

/// Shortest-distance neighbor query. `n` is bound on its own so that
/// `shortestPath` starts from two bound endpoints.
fn neighbor_query(radius: usize) -> String {
    // Variable-length bounds cannot be parameters.
    format!(
        "MATCH (a) WHERE elementId(a) = $id \
         MATCH (n) WHERE n <> a \
         MATCH p = shortestPath((a)-[*..{}]-(n)) \
         WHERE length(p) = $r \
         RETURN DISTINCT elementId(n) AS id, n ORDER BY id",
        radius
    )
}

/// Typed access to the properties of a node or relationship.
trait BoltProperties {
    fn property_keys(&self) -> Vec<&str>;
    fn integer(&self, key: &str) -> Option<i64>;
    fn float(&self, key: &str) -> Option<f64>;
    fn boolean(&self, key: &str) -> Option<bool>;
    fn string(&self, key: &str) -> Option<String>;
}

macro_rules! bolt_properties {
    ($($entity:ty),+) => {$(
        impl BoltProperties for $entity {
            fn property_keys(&self) -> Vec<&str> {
                self.keys()
            }
            fn integer(&self, key: &str) -> Option<i64> {
                self.get::<i64>(key).ok()
            }
            fn float(&self, key: &str) -> Option<f64> {
                self.get::<f64>(key).ok()
            }
            fn boolean(&self, key: &str) -> Option<bool> {
                self.get::<bool>(key).ok()
            }
            fn string(&self, key: &str) -> Option<String> {
                self.get::<String>(key).ok()
            }
        }
    )+};
}

bolt_properties!(neo4rs::Node, neo4rs::Relation);

/// Bolt values are dynamically typed; try the scalar kinds in turn.
fn read_properties(entity: &impl BoltProperties) -> Properties {
    let mut props = Properties::new();
    for key in entity.property_keys() {
        let value = if let Some(v) = entity.integer(key) {
            PropertyValue::Integer(v)
        } else if let Some(v) = entity.float(key) {
            PropertyValue::Float(v)
        } else if let Some(v) = entity.boolean(key) {
            PropertyValue::Boolean(v)
        } else if let Some(v) = entity.string(key) {
            PropertyValue::String(v)
        } else {
            PropertyValue::Null
        };
        props.insert(key.to_string(), value);
    }
    props
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    fn name(&self) -> &str {
        "neo4j"
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        let graph = self.session()?;
        graph.run(query(statement)).await.map_err(classify)?;
        debug!("Statement executed on Neo4j");
        Ok(())
    }

    async fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        self.fetch_nodes(query("MATCH (n) RETURN elementId(n) AS id, n ORDER BY id"))
            .await
    }

    async fn list_edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        let graph = self.session()?;
        let q = query(
            "MATCH (a)-[r]->(b) \
             RETURN elementId(a) AS source, elementId(b) AS target, type(r) AS rel_type, r",
        );
        let mut stream = graph.execute(q).await.map_err(classify)?;
        let mut edges = Vec::new();
        while let Some(row) = stream.next().await.map_err(classify)? {
            let rel: neo4rs::Relation = row.get("r").map_err(StoreError::backend)?;
            let properties = read_properties(&rel);
            edges.push(EdgeRecord {
                source: row.get("source").map_err(StoreError::backend)?,
                target: row.get("target").map_err(StoreError::backend)?,
                rel_type: row.get("rel_type").map_err(StoreError::backend)?,
                properties,
            });
        }
        Ok(edges)
    }

    async fn list_neighbors(&self, anchor_id: &str, radius: usize) -> StoreResult<Vec<NodeRecord>> {
        if radius == 0 {
            return Err(StoreError::InvalidRadius(radius));
        }
        if !self.anchor_exists(anchor_id).await? {
            return Err(StoreError::NodeNotFound(anchor_id.to_string()));
        }

        let cypher = neighbor_query(radius);
        let q = query(&cypher).param("id", anchor_id).param("r", radius as i64);
        self.fetch_nodes(q).await
    }

    async fn flush(&self) -> StoreResult<()> {
        let graph = self.session()?;
        graph
            .run(query("MATCH (n) DETACH DELETE n"))
            .await
            .map_err(classify)
    }

    async fn disconnect(&self) -> StoreResult<()> {
        let mut guard = self
            .graph
            .write()
            .map_err(|_| StoreError::backend("neo4j session lock poisoned"))?;
        guard.take().ok_or(StoreError::Disconnected)?;
        info!(uri = %self.uri, "Disconnected from Neo4j");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Clone)]
    enum Raw {
        Int(i64),
        Float(f64),
        Bool(bool),
        Text(&'static str),
        Null,
    }

    struct FakeEntity(BTreeMap<&'static str, Raw>);

    impl BoltProperties for FakeEntity {
        fn property_keys(&self) -> Vec<&str> {
            self.0.keys().copied().collect()
        }
        fn integer(&self, key: &str) -> Option<i64> {
            match self.0.get(key) {
                Some(Raw::Int(v)) => Some(*v),
                _ => None,
            }
        }
        fn float(&self, key: &str) -> Option<f64> {
            match self.0.get(key) {
                Some(Raw::Float(v)) => Some(*v),
                _ => None,
            }
        }
        fn boolean(&self, key: &str) -> Option<bool> {
            match self.0.get(key) {
                Some(Raw::Bool(v)) => Some(*v),
                _ => None,
            }
        }
        fn string(&self, key: &str) -> Option<String> {
            match self.0.get(key) {
                Some(Raw::Text(v)) => Some(v.to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn relationship_properties_keep_every_scalar_kind() {
        let rel = FakeEntity(BTreeMap::from([
            ("year", Raw::Int(2016)),
            ("score", Raw::Float(24.5)),
            ("overtime", Raw::Bool(false)),
            ("venue", Raw::Text("Levi's Stadium")),
            ("note", Raw::Null),
        ]));
        let props = read_properties(&rel);
        assert_eq!(props.len(), 5);
        assert_eq!(props.get("year"), Some(&PropertyValue::Integer(2016)));
        assert_eq!(props.get("score"), Some(&PropertyValue::Float(24.5)));
        assert_eq!(props.get("overtime"), Some(&PropertyValue::Boolean(false)));
        assert_eq!(
            props.get("venue"),
            Some(&PropertyValue::String("Levi's Stadium".to_string()))
        );
        assert_eq!(props.get("note"), Some(&PropertyValue::Null));
    }

    #[test]
    fn neighbor_query_binds_target_before_shortest_path() {
        let cypher = neighbor_query(2);
        let bind = cypher.find("MATCH (n) WHERE n <> a").unwrap();
        let path = cypher.find("shortestPath((a)-[*..2]-(n))").unwrap();
        assert!(bind < path);
        assert!(cypher.contains("WHERE length(p) = $r"));
    }

    #[test]
    fn count_decode_failure_is_a_backend_error() {
        assert!(count_is_positive::<String>(Ok(1)).unwrap());
        assert!(!count_is_positive::<String>(Ok(0)).unwrap());
        let err = count_is_positive::<&str>(Err("expected an integer")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(msg) if msg.contains("expected an integer")));
    }
}
