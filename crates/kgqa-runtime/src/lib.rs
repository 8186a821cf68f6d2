//! # kgqa Runtime
//!
//! Concrete graph stores and corpus loading for kgqa.
//!
//! - [`memory`]: petgraph store, the default and the one tests run against
//! - `sqlite` (feature `sqlite`): persistent single-file store
//! - `neo4j` (feature `neo4j`): a Neo4j server over Bolt
//! - [`backend`]: [`StoreConfig`](backend::StoreConfig) and the [`create_store`](backend::create_store) factory
//! - [`corpus`]: SQuAD and plain-text corpus loading
//!
//! All stores implement [`GraphStore`](kgqa_core::store::GraphStore) and accept
//! the same Cypher statements.

pub mod backend;
pub mod corpus;
mod executor;
pub mod memory;
pub mod neo4j;
pub mod prelude;
pub mod sqlite;
