//! Typed errors for the automation library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can branch on
//! the failure kind; the batch layer records [`ErrorKind`] in failure results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving workflows.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Required workflow input missing or empty
    #[error("missing required input field: {field}")]
    Validation { field: String },

    /// No descriptor could be obtained within the attempt budget
    #[error("no element found for instruction after {attempts} attempts: {instruction}")]
    ResolutionExhausted {
        instruction: String,
        attempts: u32,
        last_error: Option<String>,
    },

    /// A descriptor was resolved but executing it kept failing
    #[error("action failed after {attempts} attempts for instruction '{instruction}': {last_error}")]
    ActionExhausted {
        instruction: String,
        attempts: u32,
        last_error: String,
    },

    /// Something the run depends on is unavailable (OTP, lookup file)
    #[error("external dependency unavailable: {0}")]
    ExternalDependency(String),

    /// UI backend call failed
    #[error("UI backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Workflow reached a state it cannot continue from
    #[error("workflow error: {0}")]
    Workflow(String),

    /// Artifact or cache persistence failed
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Id list could not be assembled
    #[error("invalid id list: {0}")]
    IdList(#[from] IdListError),
}

/// Errors assembling the list of work item ids. Fatal to the whole batch.
#[derive(Debug, Error)]
pub enum IdListError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("JSON file must contain a list or an object with a 'job_ids' key")]
    UnrecognizedShape,

    #[error("unsupported id value: {0}")]
    UnsupportedValue(String),

    #[error("no ids provided")]
    NoIds,
}

/// Coarse classification of an [`AutomationError`], recorded in failure results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    ResolutionExhausted,
    ActionExhausted,
    ExternalDependency,
    Backend,
    Workflow,
    Storage,
}

impl AutomationError {
    /// Wrap any backend failure.
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(error.into())
    }

    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ResolutionExhausted { .. } => ErrorKind::ResolutionExhausted,
            Self::ActionExhausted { .. } => ErrorKind::ActionExhausted,
            Self::ExternalDependency(_) => ErrorKind::ExternalDependency,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Workflow(_) => ErrorKind::Workflow,
            Self::Storage(_) | Self::JsonParse(_) => ErrorKind::Storage,
            Self::IdList(_) => ErrorKind::Validation,
        }
    }
}

/// Result type alias for automation operations.
pub type Result<T> = std::result::Result<T, AutomationError>;
