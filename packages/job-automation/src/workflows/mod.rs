//! Scripted job-posting workflows.
//!
//! Each workflow validates its input before touching the browser, then runs
//! its instruction script through a [`ResilientExecutor`] bound to the
//! workflow's own action cache.

mod edit_country;
mod extract;
mod promotion;
mod record;

pub use edit_country::{JobEditCountry, EDIT_COUNTRY_WORKFLOW, JOB_STATE_INSTRUCTION};
pub use extract::{job_detail_url, JobExtract, JobPostingSnapshot, EXTRACT_INSTRUCTION, EXTRACT_WORKFLOW};
pub use promotion::{
    job_id_from_review_url, JobPromotion, CARD_FRAME_SELECTOR, POSTED_JOBS_URL, PROMOTION_WORKFLOW,
    QUALIFICATION_EDITORS_INSTRUCTION,
};
pub use record::{save_run_record, write_record, RunRecord};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::ActionCache;
use crate::error::{AutomationError, Result};
use crate::executor::ResilientExecutor;
use crate::traits::backend::UiBackend;
use crate::traits::processor::ItemProcessor;
use crate::types::batch::WorkItem;
use crate::types::config::AutomationConfig;

/// Workflow input: a JSON object of named fields.
pub type WorkflowInput = Map<String, Value>;

/// What a running workflow has access to.
pub struct WorkflowContext<'a> {
    pub executor: &'a ResilientExecutor,
    pub config: &'a AutomationConfig,
}

impl WorkflowContext<'_> {
    pub fn backend(&self) -> &dyn UiBackend {
        self.executor.backend()
    }

    /// Wait a scripted page-settle delay, scaled by the configuration.
    pub async fn settle(&self, millis: u64) -> Result<()> {
        let duration = self.config.settle(millis);
        if duration.is_zero() {
            return Ok(());
        }
        self.backend().wait(duration).await
    }

    pub async fn press(&self, key: &str) -> Result<()> {
        self.backend().press(key).await
    }
}

#[async_trait]
pub trait Workflow: Send + Sync {
    /// Stable name. Also names the workflow's cache document and run records.
    fn name(&self) -> &'static str;

    fn required_fields(&self) -> &'static [&'static str];

    /// Reject input with a missing or empty required field.
    fn validate(&self, input: &WorkflowInput) -> Result<()> {
        for field in self.required_fields() {
            if !is_present(input.get(*field)) {
                return Err(AutomationError::validation(*field));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<Value>;
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

/// Read a required field as text. Numbers are rendered as-is.
pub fn text_field(input: &WorkflowInput, field: &str) -> Result<String> {
    match input.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(AutomationError::validation(field)),
    }
}

/// Runs workflows against one backend session.
///
/// Action caches are loaded once per workflow name and reused across runs.
pub struct WorkflowRunner {
    backend: Arc<dyn UiBackend>,
    config: AutomationConfig,
    caches: Mutex<HashMap<&'static str, Arc<ActionCache>>>,
}

impl WorkflowRunner {
    pub fn new(backend: Arc<dyn UiBackend>, config: AutomationConfig) -> Self {
        Self {
            backend,
            config,
            caches: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn UiBackend> {
        &self.backend
    }

    /// Validate, then execute. No backend call happens for invalid input.
    pub async fn run(&self, workflow: &dyn Workflow, input: &WorkflowInput) -> Result<Value> {
        workflow.validate(input)?;

        let cache = self.cache_for(workflow.name()).await?;
        let executor = ResilientExecutor::new(self.backend.clone(), cache, self.config.retry.clone());
        let ctx = WorkflowContext {
            executor: &executor,
            config: &self.config,
        };

        tracing::info!(workflow = workflow.name(), "workflow started");
        let output = workflow.execute(&ctx, input).await?;
        tracing::info!(workflow = workflow.name(), "workflow finished");
        Ok(output)
    }

    async fn cache_for(&self, name: &'static str) -> Result<Arc<ActionCache>> {
        let loaded = self.caches.lock().unwrap().get(name).cloned();
        if let Some(cache) = loaded {
            return Ok(cache);
        }
        let cache = Arc::new(ActionCache::load(self.config.cache_path(name)).await?);
        Ok(self
            .caches
            .lock()
            .unwrap()
            .entry(name)
            .or_insert(cache)
            .clone())
    }
}

/// Adapts a workflow into a batch [`ItemProcessor`].
///
/// The item payload (when it is an object) is the workflow input; the item id
/// is inserted under `id_field`.
pub struct WorkflowProcessor {
    runner: Arc<WorkflowRunner>,
    workflow: Arc<dyn Workflow>,
    id_field: &'static str,
}

impl WorkflowProcessor {
    pub fn new(runner: Arc<WorkflowRunner>, workflow: Arc<dyn Workflow>, id_field: &'static str) -> Self {
        Self {
            runner,
            workflow,
            id_field,
        }
    }
}

#[async_trait]
impl ItemProcessor for WorkflowProcessor {
    async fn process(&self, item: &WorkItem) -> Result<Value> {
        let mut input = match &item.payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        input.insert(self.id_field.to_string(), Value::String(item.id.clone()));
        self.runner.run(self.workflow.as_ref(), &input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use serde_json::json;

    struct EchoWorkflow;

    #[async_trait]
    impl Workflow for EchoWorkflow {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn required_fields(&self) -> &'static [&'static str] {
            &["job_title", "apply_url"]
        }

        async fn execute(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<Value> {
            ctx.executor.act("Click Continue").await?;
            Ok(json!({"title": text_field(input, "job_title")?}))
        }
    }

    fn input(value: Value) -> WorkflowInput {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_validation_precedes_backend_calls() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().resolve_everything());
        let runner = WorkflowRunner::new(backend.clone(), AutomationConfig::immediate(dir.path()));

        let err = runner
            .run(&EchoWorkflow, &input(json!({"job_title": "Analyst", "apply_url": "  "})))
            .await
            .unwrap_err();

        assert!(matches!(err, AutomationError::Validation { ref field } if field == "apply_url"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_persists_cache_under_workflow_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().resolve_everything());
        let config = AutomationConfig::immediate(dir.path());
        let runner = WorkflowRunner::new(backend.clone(), config.clone());
        let payload = input(json!({"job_title": "Analyst", "apply_url": "https://apply"}));

        let output = runner.run(&EchoWorkflow, &payload).await.unwrap();
        runner.run(&EchoWorkflow, &payload).await.unwrap();

        assert_eq!(output, json!({"title": "Analyst"}));
        assert!(config.cache_path("echo").exists());
        assert_eq!(backend.observe_count("Click Continue"), 1);
    }

    #[tokio::test]
    async fn test_processor_inserts_item_id() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().resolve_everything());
        let runner = Arc::new(WorkflowRunner::new(backend, AutomationConfig::immediate(dir.path())));
        let processor = WorkflowProcessor::new(runner, Arc::new(EchoWorkflow), "job_title");

        let item = WorkItem::new("Engineer").with_payload(json!({"apply_url": "https://apply"}));
        let output = processor.process(&item).await.unwrap();

        assert_eq!(output["title"], "Engineer");
    }

    #[test]
    fn test_text_field_accepts_numbers() {
        let payload = input(json!({"jobId": 4012, "empty": ""}));
        assert_eq!(text_field(&payload, "jobId").unwrap(), "4012");
        assert!(text_field(&payload, "empty").is_err());
        assert!(text_field(&payload, "missing").is_err());
    }
}
