//! Graph store configuration and factory.
//!
//! Provides a unified interface for selecting and configuring graph storage backends.

use crate::memory::MemoryGraphStore;
use kgqa_core::error::{ConfigError, StoreError};
use kgqa_core::store::GraphStore;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "sqlite")]
use std::path::PathBuf;

/// Configuration for graph store selection.
#[derive(Debug, Clone, Default)]
pub enum StoreConfig {
    /// In-memory petgraph store (default, fast, no persistence).
    #[default]
    InMemory,

    /// SQLite-backed persistent storage.
    #[cfg(feature = "sqlite")]
    Sqlite {
        /// Path to the SQLite database file.
        /// If None, uses an in-memory SQLite database.
        path: Option<PathBuf>,
    },

    /// Remote Neo4j server.
    #[cfg(feature = "neo4j")]
    Neo4j(crate::neo4j::Neo4jConfig),
}

impl StoreConfig {
    /// Create an in-memory store configuration.
    pub fn in_memory() -> Self {
        StoreConfig::InMemory
    }

    /// Create an SQLite store configuration with a file path.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        StoreConfig::Sqlite {
            path: Some(path.into()),
        }
    }

    /// Create an SQLite store configuration with in-memory storage.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_in_memory() -> Self {
        StoreConfig::Sqlite { path: None }
    }

    /// Create a Neo4j store configuration.
    #[cfg(feature = "neo4j")]
    pub fn neo4j(uri: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        StoreConfig::Neo4j(crate::neo4j::Neo4jConfig {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
        })
    }

    /// Short backend name.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::InMemory => "memory",
            #[cfg(feature = "sqlite")]
            StoreConfig::Sqlite { .. } => "sqlite",
            #[cfg(feature = "neo4j")]
            StoreConfig::Neo4j(_) => "neo4j",
        }
    }
}

/// Shared handle to a graph store.
pub type DynGraphStore = Arc<dyn GraphStore>;

/// Open a graph store from configuration.
///
/// # Errors
/// Returns an error if the store cannot be opened (file issues, unreachable server).
pub async fn create_store(config: &StoreConfig) -> Result<DynGraphStore, BackendError> {
    match config {
        StoreConfig::InMemory => Ok(Arc::new(MemoryGraphStore::new())),

        #[cfg(feature = "sqlite")]
        StoreConfig::Sqlite { path } => {
            use crate::sqlite::SqliteGraphStore;

            let store = match path {
                Some(p) => SqliteGraphStore::open(p),
                None => SqliteGraphStore::new_in_memory(),
            }
            .map_err(BackendError::Store)?;

            Ok(Arc::new(store))
        }

        #[cfg(feature = "neo4j")]
        StoreConfig::Neo4j(neo4j) => {
            let store = crate::neo4j::Neo4jGraphStore::connect(neo4j)
                .await
                .map_err(BackendError::Store)?;
            Ok(Arc::new(store))
        }
    }
}

/// Resolve a store kind by name, failing if it was not compiled in.
pub fn check_store_kind(kind: &str) -> Result<(), BackendError> {
    match kind {
        "memory" => Ok(()),
        "sqlite" if cfg!(feature = "sqlite") => Ok(()),
        "neo4j" if cfg!(feature = "neo4j") => Ok(()),
        "sqlite" | "neo4j" => Err(BackendError::Config(ConfigError::FeatureDisabled(
            kind.to_string(),
        ))),
        other => Err(BackendError::Config(ConfigError::InvalidValue {
            field: "store.backend".to_string(),
            value: other.to_string(),
            reason: "expected memory, sqlite or neo4j".to_string(),
        })),
    }
}

/// Errors that can occur when creating graph stores.
#[derive(Debug, Clone)]
pub enum BackendError {
    /// The store could not be opened.
    Store(StoreError),

    /// The requested store is unknown or not compiled in.
    Config(ConfigError),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Store(e) => write!(f, "Store error: {}", e),
            BackendError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_in_memory_store() {
        let store = create_store(&StoreConfig::in_memory()).await.unwrap();
        assert_eq!(store.name(), "memory");
        assert_eq!(store.node_count().await.unwrap(), 0);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(check_store_kind("memory").is_ok());
        assert!(matches!(
            check_store_kind("redis"),
            Err(BackendError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn create_sqlite_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::sqlite(dir.path().join("kgqa.db"));
        assert_eq!(config.kind(), "sqlite");

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.node_count().await.unwrap(), 0);
    }
}
