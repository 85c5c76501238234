//! Snapshot of a posting's public state and promotion statistics.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::{text_field, Workflow, WorkflowContext, WorkflowInput};
use crate::error::{AutomationError, Result};

pub const EXTRACT_WORKFLOW: &str = "job_extract";

pub const EXTRACT_INSTRUCTION: &str = "Extract the job name, location, status, posting time, \
    amount spent (as a number), views (as a number), and apply clicks (as a number) from this \
    LinkedIn job posting page. Return only the numeric values for amount spent, views, and \
    apply clicks without any text or currency symbols.";

/// Detail page of a posting.
pub fn job_detail_url(job_id: &str) -> String {
    format!("https://www.linkedin.com/hiring/jobs/{}/detail/", job_id)
}

/// Fields read off a posting's detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobPostingSnapshot {
    /// The job title/name
    pub job_name: String,

    /// The job location
    pub location: String,

    /// Job status - either 'Active' or 'In Review'
    pub job_status: String,

    /// When the job was posted (e.g., '2 days ago', '5 hrs ago')
    pub posted_when: String,

    /// Amount spent on job promotion (numeric value)
    #[serde(deserialize_with = "lenient::float")]
    #[schemars(with = "f64")]
    pub amount_spent: f64,

    /// Number of job views (numeric value)
    #[serde(deserialize_with = "lenient::count")]
    #[schemars(with = "u64")]
    pub views: u64,

    /// Number of apply clicks (numeric value)
    #[serde(deserialize_with = "lenient::count")]
    #[schemars(with = "u64")]
    pub apply_clicks: u64,
}

pub struct JobExtract;

#[async_trait]
impl Workflow for JobExtract {
    fn name(&self) -> &'static str {
        EXTRACT_WORKFLOW
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["jobId"]
    }

    async fn execute(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<Value> {
        let job_id = text_field(input, "jobId")?;
        let url = job_detail_url(&job_id);

        tracing::info!(job_id = %job_id, url = %url, "opening posting");
        ctx.backend().goto(&url).await?;
        ctx.settle(5_000).await?;

        let schema = serde_json::to_value(schemars::schema_for!(JobPostingSnapshot))?;
        let raw = ctx.backend().extract(EXTRACT_INSTRUCTION, Some(&schema)).await?;
        let snapshot: JobPostingSnapshot = serde_json::from_value(raw).map_err(|e| {
            AutomationError::Workflow(format!("extraction did not match the posting schema: {}", e))
        })?;
        tracing::debug!(job_id = %job_id, job_name = %snapshot.job_name, "posting extracted");

        Ok(json!({
            "jobDetailUrl": url,
            "jobId": job_id,
            "job_name": snapshot.job_name,
            "location": snapshot.location,
            "job_status": snapshot.job_status,
            "posted_when": snapshot.posted_when,
            "amount_spent": snapshot.amount_spent,
            "views": snapshot.views,
            "apply_clicks": snapshot.apply_clicks,
            "status": "extracted",
        }))
    }
}

/// Numbers that may arrive as display text ("₹1,204.50", "1,024", "1.2K").
///
/// Text without any digit ("N/A", "-") is rejected rather than read as zero.
mod lenient {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub(super) fn parse_text(text: &str) -> std::result::Result<f64, String> {
        let trimmed = text.trim();
        let scale = match trimmed.chars().last().map(|c| c.to_ascii_uppercase()) {
            Some('K') => 1e3,
            Some('M') => 1e6,
            Some('B') => 1e9,
            _ => 1.0,
        };
        let digits: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if !digits.chars().any(|c| c.is_ascii_digit()) {
            return Err(format!("no number in {:?}", text));
        }
        digits
            .parse::<f64>()
            .map(|n| n * scale)
            .map_err(|_| format!("not a number: {:?}", text))
    }

    fn parse(raw: Raw) -> std::result::Result<f64, String> {
        match raw {
            Raw::Number(n) => Ok(n),
            Raw::Text(text) => parse_text(&text),
        }
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
        parse(Raw::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
        let value = parse(Raw::deserialize(deserializer)?).map_err(serde::de::Error::custom)?;
        Ok(value.max(0.0).round() as u64)
    }
}
