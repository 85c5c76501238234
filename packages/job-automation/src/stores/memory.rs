//! In-memory artifact store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::traits::store::ArtifactStore;
use crate::types::batch::BatchSummary;

/// Artifact store backed by a map. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<RwLock<HashMap<String, Value>>>,
    summaries: Arc<RwLock<Vec<BatchSummary>>>,
    writes: Arc<RwLock<Vec<String>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an artifact.
    pub fn with_artifact(self, id: impl Into<String>, document: Value) -> Self {
        self.artifacts.write().unwrap().insert(id.into(), document);
        self
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.read().unwrap().len()
    }

    /// Ids written through [`ArtifactStore::write`], in order.
    pub fn writes(&self) -> Vec<String> {
        self.writes.read().unwrap().clone()
    }

    /// Most recently written summary.
    pub fn last_summary(&self) -> Option<BatchSummary> {
        self.summaries.read().unwrap().last().cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.artifacts.read().unwrap().contains_key(id))
    }

    async fn write(&self, id: &str, document: &Value) -> Result<()> {
        self.artifacts
            .write()
            .unwrap()
            .insert(id.to_string(), document.clone());
        self.writes.write().unwrap().push(id.to_string());
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.artifacts.read().unwrap().get(id).cloned())
    }

    async fn write_summary(&self, summary: &BatchSummary) -> Result<()> {
        self.summaries.write().unwrap().push(summary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryArtifactStore::new().with_artifact("b", json!({"done": true}));

        assert!(store.exists("b").await.unwrap());
        assert!(!store.exists("a").await.unwrap());

        store.write("a", &json!({"n": 1})).await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(store.artifact_count(), 2);
        assert_eq!(store.writes(), vec!["a".to_string()]);
    }
}
