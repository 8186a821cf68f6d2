//! Convenient re-exports for common runtime usage.

pub use crate::backend::{check_store_kind, create_store, BackendError, DynGraphStore, StoreConfig};
pub use crate::corpus::{load_corpus, load_squad, load_text, normalize_text, parse_squad};
pub use crate::memory::MemoryGraphStore;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteGraphStore;

#[cfg(feature = "neo4j")]
pub use crate::neo4j::{Neo4jConfig, Neo4jGraphStore};

// Re-export from core
pub use kgqa_core::prelude::*;
