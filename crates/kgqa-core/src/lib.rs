//! # kgqa Core
//!
//! Core types and contracts for graph-grounded question answering.
//!
//! - [`types`]: nodes, edges, neighborhoods, corpus and answer attempts
//! - [`store`]: the [`GraphStore`](store::GraphStore) capability every graph backend implements
//! - [`statement`]: the Cypher subset understood by the in-process stores
//! - [`sanitize`]: cleanup of generated statements before they are applied
//! - [`error`]: the error taxonomy shared by every stage
//!
//! ## Quick Start
//!
//! ```rust
//! use kgqa_core::prelude::*;
//!
//! let clean = sanitize_statement("CREATE (:Team {name: 'Denver's Broncos'})", SanitizePolicy::Strip)?;
//! let stmt = Statement::parse(&clean)?;
//! assert!(!stmt.is_read_only());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod prelude;
pub mod sanitize;
pub mod statement;
pub mod store;
pub mod types;
