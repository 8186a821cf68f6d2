//! Anchor resolution: pick the one node a question is about.
//!
//! The backend sees the whole node inventory and must name one of its ids.
//! There is no retry and no fallback; without an anchor there is nothing to
//! expand from.

use kgqa_core::error::{ResolutionError, Result};
use kgqa_core::store::GraphStore;
use kgqa_core::types::NodeRecord;
use kgqa_llm::{DynLlmBackend, LlmBackend};
use tracing::debug;

pub struct AnchorResolver {
    backend: DynLlmBackend,
}

impl AnchorResolver {
    pub fn new(backend: DynLlmBackend) -> Self {
        Self { backend }
    }

    /// Resolve `question` against an explicit inventory.
    pub async fn resolve(
        &self,
        question: &str,
        inventory: &[NodeRecord],
    ) -> std::result::Result<String, ResolutionError> {
        if inventory.is_empty() {
            return Err(ResolutionError::EmptyInventory);
        }

        let id = self
            .backend
            .detect_anchor_node(question, inventory)
            .await
            .map_err(|e| ResolutionError::Backend(e.to_string()))?;

        if !inventory.iter().any(|n| n.id == id) {
            return Err(ResolutionError::UnknownNode(id));
        }

        debug!(anchor = %id, inventory = inventory.len(), "Anchor resolved");
        Ok(id)
    }

    /// Resolve `question` against the store's current inventory.
    pub async fn resolve_in(&self, store: &dyn GraphStore, question: &str) -> Result<String> {
        let inventory = store.list_nodes().await?;
        Ok(self.resolve(question, &inventory).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgqa_core::types::Properties;
    use kgqa_llm::{AnchorDetectionPrompt, MockBackend};
    use std::sync::Arc;

    fn inventory() -> Vec<NodeRecord> {
        ["Denver Broncos", "Carolina Panthers"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut props = Properties::new();
                props.insert("name".into(), (*name).into());
                NodeRecord::new(format!("n{}", i), vec!["Team".into()], props)
            })
            .collect()
    }

    fn resolver(response: &str) -> AnchorResolver {
        AnchorResolver::new(Arc::new(
            MockBackend::new().with_response(AnchorDetectionPrompt::TASK, response),
        ))
    }

    #[tokio::test]
    async fn resolves_known_node() {
        let id = resolver(r#"{"node_id": "n1"}"#)
            .resolve("Who defeated the Panthers?", &inventory())
            .await
            .unwrap();
        assert_eq!(id, "n1");
    }

    #[tokio::test]
    async fn numeric_id_is_accepted() {
        let mut nodes = inventory();
        nodes[0].id = "42".into();
        let id = resolver(r#"{"node_id": 42}"#)
            .resolve("Who won?", &nodes)
            .await
            .unwrap();
        assert_eq!(id, "42");
    }

    #[tokio::test]
    async fn id_outside_inventory_is_rejected() {
        let err = resolver(r#"{"node_id": "n9"}"#)
            .resolve("Who?", &inventory())
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::UnknownNode("n9".into()));
    }

    #[tokio::test]
    async fn malformed_output_is_a_resolution_error() {
        let err = resolver("the Panthers node")
            .resolve("Who?", &inventory())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Backend(_)));
    }

    #[tokio::test]
    async fn empty_inventory_skips_backend() {
        let backend = Arc::new(MockBackend::new());
        let resolver = AnchorResolver::new(backend.clone());
        let err = resolver.resolve("Who?", &[]).await.unwrap_err();
        assert_eq!(err, ResolutionError::EmptyInventory);
        assert_eq!(backend.call_count(), 0);
    }
}
