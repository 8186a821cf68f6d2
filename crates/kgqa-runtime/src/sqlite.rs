//! SQLite-backed graph store.
//!
//! Nodes and edges live in two tables with labels and properties stored as
//! JSON. Node ids are `n{rowid}`. Every statement runs in its own transaction,
//! and neighbor layers come from a recursive CTE over the undirected edge set.

#![cfg(feature = "sqlite")]

use crate::executor::{self, labels_contain, properties_contain, GraphWriter};
use async_trait::async_trait;
use kgqa_core::error::{StoreError, StoreResult};
use kgqa_core::statement::Statement;
use kgqa_core::store::GraphStore;
use kgqa_core::types::{EdgeRecord, NodeRecord, Properties, PropertyValue};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY,
        labels TEXT NOT NULL,
        properties TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY,
        source INTEGER NOT NULL,
        target INTEGER NOT NULL,
        rel_type TEXT NOT NULL,
        properties TEXT NOT NULL,
        FOREIGN KEY (source) REFERENCES nodes(id),
        FOREIGN KEY (target) REFERENCES nodes(id)
    );

    CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
    CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
"#;

const NEIGHBOR_LAYER: &str = r#"
    WITH RECURSIVE
        adjacent(a, b) AS (
            SELECT source, target FROM edges
            UNION
            SELECT target, source FROM edges
        ),
        reach(id, depth) AS (
            SELECT ?1, 0
            UNION
            SELECT adjacent.b, reach.depth + 1
            FROM reach JOIN adjacent ON adjacent.a = reach.id
            WHERE reach.depth < ?2
        )
    SELECT n.id, n.labels, n.properties
    FROM nodes n
    JOIN (SELECT id, MIN(depth) AS depth FROM reach GROUP BY id) r ON r.id = n.id
    WHERE r.depth = ?2
    ORDER BY n.id
"#;

/// SQLite-backed [`GraphStore`].
pub struct SqliteGraphStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteGraphStore {
    /// Create a new in-memory SQLite graph.
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        Self::init_with_connection(conn)
    }

    /// Create or open a file-backed SQLite graph.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(connection_error)?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(connection_error)?;
        conn.execute_batch(SCHEMA).map_err(StoreError::backend)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::backend("sqlite connection lock poisoned"))?;
        let conn = guard.as_mut().ok_or(StoreError::Disconnected)?;
        f(conn)
    }

    /// Node and edge counts.
    pub fn stats(&self) -> StoreResult<(usize, usize)> {
        self.with_conn(|conn| {
            let nodes: usize = conn
                .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
                .map_err(StoreError::backend)?;
            let edges: usize = conn
                .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
                .map_err(StoreError::backend)?;
            Ok((nodes, edges))
        })
    }
}

fn connection_error(e: rusqlite::Error) -> StoreError {
    StoreError::Connection(e.to_string())
}

fn node_id(rowid: i64) -> String {
    format!("n{}", rowid)
}

fn parse_node_id(id: &str) -> StoreResult<i64> {
    id.strip_prefix('n')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(StoreError::backend)
}

/// Raw node columns, decoded outside the rusqlite row callback.
struct NodeRow {
    id: i64,
    labels: String,
    properties: String,
}

impl NodeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            labels: row.get(1)?,
            properties: row.get(2)?,
        })
    }

    fn decode(self) -> StoreResult<(i64, Vec<String>, Properties)> {
        let labels = serde_json::from_str(&self.labels).map_err(StoreError::backend)?;
        let properties = serde_json::from_str(&self.properties).map_err(StoreError::backend)?;
        Ok((self.id, labels, properties))
    }

    fn into_record(self) -> StoreResult<NodeRecord> {
        let (id, labels, properties) = self.decode()?;
        Ok(NodeRecord::new(node_id(id), labels, properties))
    }
}

fn query_nodes(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> StoreResult<Vec<NodeRow>> {
    let mut stmt = conn.prepare(sql).map_err(StoreError::backend)?;
    let rows = stmt
        .query_map(args, NodeRow::from_row)
        .map_err(StoreError::backend)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(StoreError::backend)?;
    Ok(rows)
}

/// Executor view over an open transaction.
struct SqliteWriter<'a> {
    conn: &'a Connection,
}

impl SqliteWriter<'_> {
    fn load_node(&self, id: &str) -> StoreResult<(Vec<String>, Properties)> {
        let rowid = parse_node_id(id)?;
        let row = self
            .conn
            .query_row(
                "SELECT id, labels, properties FROM nodes WHERE id = ?1",
                params![rowid],
                NodeRow::from_row,
            )
            .optional()
            .map_err(StoreError::backend)?
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
        let (_, labels, properties) = row.decode()?;
        Ok((labels, properties))
    }
}

impl GraphWriter for SqliteWriter<'_> {
    fn find_nodes(&self, labels: &[String], properties: &Properties) -> StoreResult<Vec<String>> {
        let mut ids = Vec::new();
        for row in query_nodes(self.conn, "SELECT id, labels, properties FROM nodes ORDER BY id", [])? {
            let (id, have_labels, have_props) = row.decode()?;
            if labels_contain(&have_labels, labels) && properties_contain(&have_props, properties) {
                ids.push(node_id(id));
            }
        }
        Ok(ids)
    }

    fn node_matches(&self, id: &str, labels: &[String], properties: &Properties) -> StoreResult<bool> {
        let (have_labels, have_props) = self.load_node(id)?;
        Ok(labels_contain(&have_labels, labels) && properties_contain(&have_props, properties))
    }

    fn create_node(&mut self, labels: &[String], properties: &Properties) -> StoreResult<String> {
        self.conn
            .execute(
                "INSERT INTO nodes (labels, properties) VALUES (?1, ?2)",
                params![to_json(&labels)?, to_json(properties)?],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(node_id(self.conn.last_insert_rowid()))
    }

    fn has_edge(
        &self,
        source: &str,
        target: &str,
        rel_type: Option<&str>,
        properties: &Properties,
    ) -> StoreResult<bool> {
        let (from, to) = (parse_node_id(source)?, parse_node_id(target)?);
        let mut stmt = self
            .conn
            .prepare("SELECT rel_type, properties FROM edges WHERE source = ?1 AND target = ?2")
            .map_err(StoreError::backend)?;
        let edges = stmt
            .query_map(params![from, to], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(StoreError::backend)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::backend)?;

        for (have_type, have_props) in edges {
            let have_props: Properties =
                serde_json::from_str(&have_props).map_err(StoreError::backend)?;
            if rel_type.map_or(true, |t| t == have_type) && properties_contain(&have_props, properties) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn create_edge(
        &mut self,
        source: &str,
        target: &str,
        rel_type: &str,
        properties: &Properties,
    ) -> StoreResult<()> {
        // Both endpoints must exist.
        self.load_node(source)?;
        self.load_node(target)?;
        self.conn
            .execute(
                "INSERT INTO edges (source, target, rel_type, properties) VALUES (?1, ?2, ?3, ?4)",
                params![
                    parse_node_id(source)?,
                    parse_node_id(target)?,
                    rel_type,
                    to_json(properties)?
                ],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(())
    }

    fn set_property(&mut self, id: &str, key: &str, value: &PropertyValue) -> StoreResult<()> {
        let (_, mut properties) = self.load_node(id)?;
        properties.insert(key.to_string(), value.clone());
        self.conn
            .execute(
                "UPDATE nodes SET properties = ?1 WHERE id = ?2",
                params![to_json(&properties)?, parse_node_id(id)?],
            )
            .map_err(|e| StoreError::Execution(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        let parsed = Statement::parse(statement)?;
        self.with_conn(|conn| {
            let tx = conn.transaction().map_err(StoreError::backend)?;
            executor::apply(&mut SqliteWriter { conn: &tx }, &parsed)?;
            tx.commit().map_err(StoreError::backend)?;
            debug!("Statement committed");
            Ok(())
        })
    }

    async fn list_nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        self.with_conn(|conn| {
            query_nodes(conn, "SELECT id, labels, properties FROM nodes ORDER BY id", [])?
                .into_iter()
                .map(NodeRow::into_record)
                .collect()
        })
    }

    async fn list_edges(&self) -> StoreResult<Vec<EdgeRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT source, target, rel_type, properties FROM edges ORDER BY id")
                .map_err(StoreError::backend)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(StoreError::backend)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(StoreError::backend)?;

            rows.into_iter()
                .map(|(source, target, rel_type, props)| {
                    Ok(EdgeRecord {
                        source: node_id(source),
                        target: node_id(target),
                        rel_type,
                        properties: serde_json::from_str(&props).map_err(StoreError::backend)?,
                    })
                })
                .collect()
        })
    }

    async fn list_neighbors(&self, anchor_id: &str, radius: usize) -> StoreResult<Vec<NodeRecord>> {
        if radius == 0 {
            return Err(StoreError::InvalidRadius(radius));
        }
        self.with_conn(|conn| {
            let anchor = parse_node_id(anchor_id)?;
            let exists = conn
                .query_row("SELECT 1 FROM nodes WHERE id = ?1", params![anchor], |_| Ok(()))
                .optional()
                .map_err(StoreError::backend)?
                .is_some();
            if !exists {
                return Err(StoreError::NodeNotFound(anchor_id.to_string()));
            }

            query_nodes(conn, NEIGHBOR_LAYER, params![anchor, radius as i64])?
                .into_iter()
                .map(NodeRow::into_record)
                .collect()
        })
    }

    async fn flush(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM edges; DELETE FROM nodes;")
                .map_err(StoreError::backend)
        })
    }

    async fn disconnect(&self) -> StoreResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::backend("sqlite connection lock poisoned"))?;
        let conn = guard.take().ok_or(StoreError::Disconnected)?;
        conn.close().map_err(|(_, e)| StoreError::backend(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_in_memory() {
        let store = SqliteGraphStore::new_in_memory().unwrap();
        store
            .execute("MERGE (a:Team {name: 'Denver Broncos', titles: 3})-[:DEFEATED {score: '24-10'}]->(b:Team {name: 'Carolina Panthers'})")
            .await
            .unwrap();

        let nodes = store.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "n1");
        assert_eq!(nodes[0].property("titles"), Some(&PropertyValue::Integer(3)));

        let edges = store.list_edges().await.unwrap();
        assert_eq!(edges[0].rel_type, "DEFEATED");
        assert_eq!(edges[0].properties["score"].as_str(), Some("24-10"));
    }

    #[tokio::test]
    async fn test_file_backed_and_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteGraphStore::open(dir.path().join("graph.db")).unwrap();

        store.execute("CREATE (:Team {name: 'Broncos'})").await.unwrap();
        assert!(store
            .execute("CREATE (:Team {name: 'Panthers'}) SET x.name = 'y'")
            .await
            .is_err());
        assert_eq!(store.stats().unwrap(), (1, 0));
    }

    #[tokio::test]
    async fn test_where_filtered_edge_statement() {
        let store = SqliteGraphStore::new_in_memory().unwrap();
        for stmt in [
            "MERGE (:Team {name: 'Denver Broncos'})",
            "MERGE (:Team {name: 'Carolina Panthers'})",
            "MATCH (a:Team), (b:Team) WHERE a.name = 'Denver Broncos' AND b.name = 'Carolina Panthers' CREATE (a)-[:DEFEATED]->(b)",
            "MERGE (a:Team {name: 'Denver Broncos'}) ON CREATE SET a.titles = 0 ON MATCH SET a.titles = 3",
        ] {
            store.execute(stmt).await.unwrap();
        }

        assert_eq!(store.stats().unwrap(), (2, 1));
        let nodes = store.list_nodes().await.unwrap();
        let broncos = nodes
            .iter()
            .find(|n| n.display_name() == "Denver Broncos")
            .unwrap();
        assert_eq!(broncos.property("titles"), Some(&PropertyValue::Integer(3)));
    }

    #[tokio::test]
    async fn test_neighbor_layers() {
        let store = SqliteGraphStore::new_in_memory().unwrap();
        store
            .execute("CREATE (a:N {name: 'a'})-[:R]->(b:N {name: 'b'})<-[:R]-(c:N {name: 'c'})-[:R]->(d:N {name: 'd'})")
            .await
            .unwrap();

        let ids = |nodes: Vec<NodeRecord>| nodes.into_iter().map(|n| n.id).collect::<Vec<_>>();
        assert_eq!(ids(store.list_neighbors("n1", 1).await.unwrap()), vec!["n2"]);
        assert_eq!(ids(store.list_neighbors("n1", 2).await.unwrap()), vec!["n3"]);
        assert_eq!(ids(store.list_neighbors("n1", 3).await.unwrap()), vec!["n4"]);
        assert!(store.list_neighbors("n1", 4).await.unwrap().is_empty());
        assert_eq!(
            store.list_neighbors("n42", 1).await.unwrap_err(),
            StoreError::NodeNotFound("n42".into())
        );
    }

    #[tokio::test]
    async fn test_flush_and_disconnect() {
        let store = SqliteGraphStore::new_in_memory().unwrap();
        store.execute("CREATE (:N {name: 'a'})").await.unwrap();
        store.flush().await.unwrap();
        assert_eq!(store.node_count().await.unwrap(), 0);

        store.execute("CREATE (:N {name: 'b'})").await.unwrap();
        assert_eq!(store.list_nodes().await.unwrap()[0].id, "n1");

        store.disconnect().await.unwrap();
        assert_eq!(store.flush().await.unwrap_err(), StoreError::Disconnected);
    }
}
