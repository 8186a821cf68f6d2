//! Shared application state.

use anyhow::{Context, Result};
use kgqa::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Cli;

/// State handed to every handler.
///
/// Asks share the read side of `graph_lock`; a build takes the write side,
/// since it flushes the store out from under any question in flight.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QaPipeline>,
    pub graph_lock: Arc<RwLock<()>>,
}

impl AppState {
    pub fn new(pipeline: QaPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            graph_lock: Arc::new(RwLock::new(())),
        }
    }

    /// End the store session once in-flight requests have released the graph.
    pub async fn close(&self) -> Result<()> {
        let _guard = self.graph_lock.write().await;
        let store = self.pipeline.store();
        store
            .disconnect()
            .await
            .with_context(|| format!("Failed to close {} store", store.name()))
    }

    /// Open the backend and store named on the command line.
    pub async fn from_cli(cli: &Cli) -> Result<Self> {
        let kind: BackendKind = cli.backend.parse()?;
        let mut llm = kind.default_config();
        if let Some(model) = &cli.model {
            llm = llm.with_model(model.clone());
        }
        let backend = create_backend(kind, llm, cli.endpoint.as_deref())
            .with_context(|| format!("Failed to create {} backend", kind))?;

        let store_config = store_config(cli);
        let store = create_store(&store_config)
            .await
            .with_context(|| format!("Failed to open {} store", store_config.kind()))?;

        let retrieval = RetrievalConfig {
            max_radius: cli.max_radius,
            ..RetrievalConfig::default()
        };

        Ok(Self::new(QaPipeline::new(backend, store, retrieval)?))
    }
}

fn store_config(cli: &Cli) -> StoreConfig {
    #[cfg(feature = "neo4j")]
    if let Some(uri) = &cli.neo4j_uri {
        return StoreConfig::neo4j(uri, &cli.neo4j_user, cli.neo4j_password.clone());
    }

    match &cli.db {
        Some(path) => StoreConfig::sqlite(path),
        None => StoreConfig::in_memory(),
    }
}
