//! Hooks the batch orchestrator drives per item.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::batch::{BatchResult, WorkItem};

/// Processes one work item into a result document.
///
/// Errors are isolated to the item by the orchestrator.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, item: &WorkItem) -> Result<Value>;
}

/// Attaches auxiliary fields to a successful result document.
///
/// Enrichment never fails an item: lookups that miss leave fields empty.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, id: &str, document: &mut Map<String, Value>);
}

/// Receives each outcome as soon as it is known.
pub trait BatchObserver: Send + Sync {
    /// `position` is 1-based among the items of its kind (skipped or pending).
    fn on_result(&self, position: usize, total: usize, result: &BatchResult);
}

/// Logs every outcome through `tracing`.
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_result(&self, position: usize, total: usize, result: &BatchResult) {
        match result {
            BatchResult::Success { id, .. } => {
                tracing::info!(id = %id, "[{}/{}] processed", position, total)
            }
            BatchResult::Failure { id, error, .. } => {
                tracing::warn!(id = %id, error = %error, "[{}/{}] failed", position, total)
            }
            BatchResult::Skipped { id } => {
                tracing::info!(id = %id, "skipping (already exists)")
            }
        }
    }
}
