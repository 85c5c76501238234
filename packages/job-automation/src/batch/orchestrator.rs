//! Resumable, failure-isolating batch runs.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::traits::processor::{BatchObserver, Enricher, ItemProcessor, TracingObserver};
use crate::traits::store::ArtifactStore;
use crate::types::batch::{BatchResult, BatchSummary, WorkItem};

/// Outcome of one [`BatchOrchestrator::run`].
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Ids skipped because their artifact already existed, in request order.
    pub skipped: Vec<String>,
    /// Aggregate with the outcome of every processed item, in processing order.
    pub summary: BatchSummary,
    /// Whether the summary document was written. False when nothing was
    /// pending or the store rejected it.
    pub summary_written: bool,
}

impl BatchRun {
    pub fn results(&self) -> &[BatchResult] {
        &self.summary.results
    }
}

/// Drives work items one at a time through an [`ItemProcessor`].
///
/// Items whose artifact already exists are skipped unless forced. A failing
/// item is recorded and the run moves on. Store errors are per-item too: an
/// unreadable artifact counts as missing, and an artifact that cannot be
/// written turns the item into a failure. The summary is always attempted.
pub struct BatchOrchestrator {
    store: Arc<dyn ArtifactStore>,
    item_pause: Duration,
    enricher: Option<Arc<dyn Enricher>>,
    observer: Arc<dyn BatchObserver>,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            item_pause: Duration::from_secs(2),
            enricher: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Pause after each processed item.
    pub fn with_item_pause(mut self, pause: Duration) -> Self {
        self.item_pause = pause;
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        processor: &dyn ItemProcessor,
        force: bool,
    ) -> Result<BatchRun> {
        let (pending, skipped) = self.partition(items, force).await;

        for (i, id) in skipped.iter().enumerate() {
            self.observer
                .on_result(i + 1, skipped.len(), &BatchResult::Skipped { id: id.clone() });
        }

        if pending.is_empty() {
            tracing::info!(skipped = skipped.len(), "nothing to process");
            return Ok(BatchRun {
                summary: BatchSummary::new(Vec::new(), skipped.clone()),
                skipped,
                summary_written: false,
            });
        }

        tracing::info!(
            pending = pending.len(),
            skipped = skipped.len(),
            force,
            "starting batch"
        );

        let total = pending.len();
        let mut results = Vec::with_capacity(total);
        for (i, item) in pending.iter().enumerate() {
            tracing::debug!(id = %item.id, "[{}/{}] processing", i + 1, total);

            let result = self.persist(self.process_one(item, processor).await).await;
            self.observer.on_result(i + 1, total, &result);
            results.push(result);

            if !self.item_pause.is_zero() {
                tokio::time::sleep(self.item_pause).await;
            }
        }

        let summary = BatchSummary::new(results, skipped.clone());
        let summary_written = match self.store.write_summary(&summary).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "could not save batch summary");
                false
            }
        };
        tracing::info!(
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped_existing,
            "batch completed"
        );

        Ok(BatchRun {
            skipped,
            summary,
            summary_written,
        })
    }

    async fn partition(&self, items: Vec<WorkItem>, force: bool) -> (Vec<WorkItem>, Vec<String>) {
        let mut pending = Vec::new();
        let mut skipped = Vec::new();
        for item in items {
            let done = !force
                && match self.store.exists(&item.id).await {
                    Ok(exists) => exists,
                    Err(e) => {
                        tracing::warn!(id = %item.id, error = %e, "artifact check failed, treating as pending");
                        false
                    }
                };
            if done {
                skipped.push(item.id);
            } else {
                pending.push(item);
            }
        }
        (pending, skipped)
    }

    /// Write the item's artifact. A rejected write fails the item.
    async fn persist(&self, result: BatchResult) -> BatchResult {
        let Some(document) = result.artifact_document() else {
            return result;
        };
        match self.store.write(result.id(), &document).await {
            Ok(()) => result,
            Err(e) if result.is_failure() => {
                tracing::warn!(id = %result.id(), error = %e, "could not save failure marker");
                result
            }
            Err(e) => {
                tracing::warn!(id = %result.id(), error = %e, "could not save artifact");
                BatchResult::failure(result.id(), &e)
            }
        }
    }

    async fn process_one(&self, item: &WorkItem, processor: &dyn ItemProcessor) -> BatchResult {
        match processor.process(item).await {
            Ok(mut data) => {
                if let (Some(enricher), Value::Object(document)) = (&self.enricher, &mut data) {
                    enricher.enrich(&item.id, document).await;
                }
                BatchResult::Success {
                    id: item.id.clone(),
                    data,
                }
            }
            Err(e) => BatchResult::failure(item.id.clone(), &e),
        }
    }
}
