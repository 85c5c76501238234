//! Change the employee location of an existing, active posting.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{text_field, Workflow, WorkflowContext, WorkflowInput};
use crate::error::Result;

pub const EDIT_COUNTRY_WORKFLOW: &str = "job_edit_country";

pub const JOB_STATE_INSTRUCTION: &str =
    "Extract the job state label shown on this page (for example Active or In review).";

const EDIT_JOB_DETAILS: &str = r#"Click the "Edit job details" button. Set method='click'"#;
const EDIT_LOCATION: &str = r#"Click the "Edit employee location" pencil icon. Set method='click'"#;
const LOCATION_FIELD: &str = r#"Locate the "Employee location" input field"#;
const CONTINUE: &str = r#"Click the "Continue" button on job details. Set method='click'"#;

pub struct JobEditCountry;

/// All digit runs of a URL, concatenated.
fn digits_of(url: &str) -> String {
    url.chars().filter(char::is_ascii_digit).collect()
}

/// Free-form extraction answer as text.
fn extraction_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => map
            .get("extraction")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Whether a state label reads as active. "Inactive" does not.
fn is_active(state: &str) -> bool {
    state
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "active")
}

#[async_trait]
impl Workflow for JobEditCountry {
    fn name(&self) -> &'static str {
        EDIT_COUNTRY_WORKFLOW
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["job_detail_url", "employee_location"]
    }

    async fn execute(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<Value> {
        let detail_url = text_field(input, "job_detail_url")?;
        let location = text_field(input, "employee_location")?;
        let backend = ctx.backend();

        backend.goto(&detail_url).await?;

        let state = match backend.extract(JOB_STATE_INSTRUCTION, None).await {
            Ok(value) => extraction_text(&value),
            Err(e) => {
                tracing::warn!(error = %e, "unable to extract job state");
                String::new()
            }
        };

        let current_url = backend.current_url().await?;
        let job_id = digits_of(if current_url.is_empty() {
            &detail_url
        } else {
            &current_url
        });

        if !is_active(&state) {
            tracing::info!(job_id = %job_id, state = %state, "job not active, leaving location unchanged");
            let label = if state.is_empty() { "unknown" } else { state.as_str() };
            return Ok(json!({
                "jobDetailUrl": current_url,
                "jobId": job_id,
                "jobState": label,
                "status": "job_not_active",
            }));
        }

        ctx.executor.act(EDIT_JOB_DETAILS).await?;
        ctx.executor.act(EDIT_LOCATION).await?;
        ctx.executor.fill(LOCATION_FIELD, &location).await?;
        ctx.settle(2_000).await?;
        ctx.press("ArrowDown").await?;
        ctx.press("Enter").await?;
        ctx.executor.act(CONTINUE).await?;

        tracing::info!(job_id = %job_id, location = %location, "location updated");
        let final_url = backend.current_url().await?;
        let label = if state.is_empty() { "Active" } else { state.as_str() };
        Ok(json!({
            "jobDetailUrl": final_url,
            "jobId": job_id,
            "jobState": label,
            "status": "updated",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutomationError;
    use crate::testing::{MockBackend, MockBackendCall};
    use crate::types::config::AutomationConfig;
    use crate::workflows::WorkflowRunner;
    use std::sync::Arc;

    const DETAIL: &str = "https://www.linkedin.com/hiring/jobs/4098765/detail/";

    fn input(location: &str) -> WorkflowInput {
        json!({"job_detail_url": DETAIL, "employee_location": location})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_state_label_matching() {
        assert!(is_active("Active"));
        assert!(is_active("  ACTIVE - promoted"));
        assert!(!is_active("Inactive"));
        assert!(!is_active("In review"));
        assert!(!is_active(""));
    }

    #[test]
    fn test_digits_of_url() {
        assert_eq!(digits_of(DETAIL), "4098765");
    }

    #[tokio::test]
    async fn test_active_job_gets_new_location() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .resolve_everything()
                .with_extraction(JOB_STATE_INSTRUCTION, json!({"extraction": "Active"})),
        );
        let runner = WorkflowRunner::new(backend.clone(), AutomationConfig::immediate(dir.path()));

        let output = runner.run(&JobEditCountry, &input("Brazil")).await.unwrap();

        assert_eq!(output["status"], "updated");
        assert_eq!(output["jobId"], "4098765");
        assert_eq!(output["jobState"], "Active");
        assert!(backend.calls().contains(&MockBackendCall::Fill {
            selector: format!("mock://{}", LOCATION_FIELD),
            value: "Brazil".into()
        }));
        assert!(backend.calls().contains(&MockBackendCall::Press { key: "Enter".into() }));
    }

    #[tokio::test]
    async fn test_inactive_job_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .resolve_everything()
                .with_extraction(JOB_STATE_INSTRUCTION, json!({"extraction": "In review"})),
        );
        let runner = WorkflowRunner::new(backend.clone(), AutomationConfig::immediate(dir.path()));

        let output = runner.run(&JobEditCountry, &input("Brazil")).await.unwrap();

        assert_eq!(output["status"], "job_not_active");
        assert_eq!(output["jobState"], "In review");
        assert!(backend.acted_selectors().is_empty());
    }

    #[tokio::test]
    async fn test_state_extraction_failure_reads_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new()
                .resolve_everything()
                .failing_extraction(JOB_STATE_INSTRUCTION, "timeout"),
        );
        let runner = WorkflowRunner::new(backend, AutomationConfig::immediate(dir.path()));

        let output = runner.run(&JobEditCountry, &input("India")).await.unwrap();

        assert_eq!(output["status"], "job_not_active");
        assert_eq!(output["jobState"], "unknown");
    }

    #[tokio::test]
    async fn test_unresolvable_edit_button_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(
            MockBackend::new().with_extraction(JOB_STATE_INSTRUCTION, json!("Active")),
        );
        let runner = WorkflowRunner::new(backend, AutomationConfig::immediate(dir.path()));

        let err = runner.run(&JobEditCountry, &input("India")).await.unwrap_err();
        assert!(matches!(err, AutomationError::ResolutionExhausted { .. }));
    }
}
