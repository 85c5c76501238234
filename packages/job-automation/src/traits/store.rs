//! Artifact storage trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::batch::BatchSummary;

/// One persisted document per work item.
///
/// Existence of an item's artifact is the only signal the batch layer uses to
/// decide an item is already done.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact exists for `id`.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Store the artifact for `id`, replacing any previous one.
    async fn write(&self, id: &str, document: &Value) -> Result<()>;

    /// Read the artifact for `id`.
    async fn read(&self, id: &str) -> Result<Option<Value>>;

    /// Store the summary of a batch run, replacing any previous one.
    async fn write_summary(&self, summary: &BatchSummary) -> Result<()>;
}
