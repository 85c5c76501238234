//! Work items, per-item outcomes, and the batch summary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AutomationError, ErrorKind};

/// One unit of batch processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,

    #[serde(default)]
    pub payload: Value,
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Items for a list of ids with empty payloads.
    pub fn from_ids(ids: impl IntoIterator<Item = impl Into<String>>) -> Vec<Self> {
        ids.into_iter().map(Self::new).collect()
    }
}

/// Outcome of one work item. Every item yields exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchResult {
    Success {
        id: String,
        data: Value,
    },
    Failure {
        id: String,
        kind: ErrorKind,
        error: String,
    },
    /// An artifact already existed and the run was not forced.
    Skipped {
        id: String,
    },
}

impl BatchResult {
    pub fn failure(id: impl Into<String>, error: &AutomationError) -> Self {
        Self::Failure {
            id: id.into(),
            kind: error.kind(),
            error: error.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } | Self::Skipped { id } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Document persisted as the item's artifact.
    ///
    /// Successes persist their data as-is; failures persist a marker document
    /// so the item counts as attempted on the next run.
    pub fn artifact_document(&self) -> Option<Value> {
        match self {
            Self::Success { data, .. } => Some(data.clone()),
            Self::Failure { id, kind, error } => Some(json!({
                "id": id,
                "status": "failed",
                "kind": kind,
                "error": error,
            })),
            Self::Skipped { .. } => None,
        }
    }
}

/// Aggregate of one batch run. Computed fresh each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_requested: usize,
    pub processed: usize,
    pub skipped_existing: usize,
    pub successful: usize,
    pub failed: usize,
    /// Outcomes of processed items, in processing order.
    pub results: Vec<BatchResult>,
    /// Ids skipped because their artifact already existed.
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl BatchSummary {
    /// `results` should hold processed outcomes only; any `Skipped` entry is
    /// moved to the skip list so the counts always add up.
    pub fn new(results: Vec<BatchResult>, mut skipped: Vec<String>) -> Self {
        let (results, stray): (Vec<_>, Vec<_>) = results
            .into_iter()
            .partition(|r| !matches!(r, BatchResult::Skipped { .. }));
        for result in stray {
            let id = result.id().to_string();
            if !skipped.contains(&id) {
                skipped.push(id);
            }
        }

        let successful = results.iter().filter(|r| r.is_success()).count();
        let failed = results.iter().filter(|r| r.is_failure()).count();
        let processed = successful + failed;
        Self {
            total_requested: processed + skipped.len(),
            processed,
            skipped_existing: skipped.len(),
            successful,
            failed,
            results,
            skipped,
        }
    }

    /// Ids and messages of failed items.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| match r {
            BatchResult::Failure { id, error, .. } => Some((id.as_str(), error.as_str())),
            _ => None,
        })
    }
}
