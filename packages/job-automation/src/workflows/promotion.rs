//! Post a free job, fill in its details, and buy a promotion for it.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::extract::job_detail_url;
use super::{text_field, Workflow, WorkflowContext, WorkflowInput};
use crate::error::{AutomationError, Result};
use crate::executor::Mode;
use crate::traits::otp::OtpSource;

pub const PROMOTION_WORKFLOW: &str = "job_promotion";

pub const POSTED_JOBS_URL: &str = "https://www.linkedin.com/my-items/posted-jobs/";

pub const CARD_FRAME_SELECTOR: &str = r#"iframe[title="Credit card input fields"]"#;

pub const QUALIFICATION_EDITORS_INSTRUCTION: &str =
    "Locate each qualification text editor on the page";

const CARD_NUMBER_SELECTOR: &str = r#"div[autocomplete="cc-number"] input"#;
const CARD_EXPIRATION_SELECTOR: &str = r#"div[autocomplete="cc-exp"] input"#;
const CARD_CSC_SELECTOR: &str = r#"div[autocomplete="cc-csc"] input"#;

/// Attempts at filling the card iframe before the run is abandoned.
const CARD_ENTRY_ATTEMPTS: u32 = 3;

/// Daily budget entered when the input does not name one.
const DEFAULT_BUDGET: &str = "130";

const REQUIRED: &[&str] = &[
    "job_title",
    "employee_location",
    "job_description",
    "apply_url",
    "card_number",
    "card_expiration",
    "card_security_code",
    "card_postal_code",
];

/// One scripted step before checkout.
enum Step {
    Act(&'static str),
    /// Not cached: the control moves between runs.
    ActUncached(&'static str),
    Fill(&'static str, &'static str),
    Keys(&'static [&'static str], u64),
}

/// Job details page, after the review URL yields the job id.
const DETAILS: &[Step] = &[
    Step::Act(r#"Click the "Edit job details" button. Set method='click'"#),
    Step::Fill(r#"Locate the "Employee location" field"#, "employee_location"),
    Step::Keys(&["ArrowDown", "Enter"], 2_000),
    Step::Fill("Locate the job description editor area", "job_description"),
    Step::Act(r#"Click the "Continue" button on job details. Set method='click'"#),
    Step::Act(r#"Click the "Edit applicant collection" button. Set method='click'"#),
    Step::Act(r#"Click the "On Linkedin" dropdown. Set method='click'"#),
    Step::Keys(&["ArrowDown", "ArrowDown", "Enter"], 500),
    Step::Fill(r#"Locate the "Website address" input field"#, "apply_url"),
    Step::Act(r#"Click the "Edit hiring frame" button. Set method='click'"#),
    Step::Act(r#"Click the "No, don't add the photo frame" option. Set method='click'"#),
    Step::Act(r#"Click the "Continue" button on job settings. Set method='click'"#),
];

/// Plan and budget selection, after the qualifications are cleared.
const PLAN: &[Step] = &[
    Step::Act(r#"Click the "Continue" button on qualifications. Set method='click'"#),
    Step::ActUncached(
        r#"Click the radio input for the promoted plan (dont click the "Promoted Plus"). Set method='click'"#,
    ),
    Step::Act(r#"Click the "Edit" button for the promoted budget. Set method='click'"#),
    Step::Fill("Locate the job posting budget setter input tag", "budget"),
    Step::Act(r#"Click the "Set budget" button. Set method='click'"#),
];

const POST_FREE_JOB: &str = r#"Click the "Post a free job" button. Set method='click'"#;
const JOB_TITLE_FIELD: &str = r#"Locate the "Job title" input field"#;
const POST_JOB: &str = r#"Click the "Post job" button. Set method='click'"#;
const ADD_CARD: &str = r#"Click the "Add card" button. Set method='click'"#;
const PROMOTE_JOB: &str = r#"Click the "Promote job" button. Set method='click'"#;
const OTP_FIELD: &str = "Locate the one-time password input field";
const SUBMIT_OTP: &str =
    r#"Click the "Submit" button to confirm the one-time password. Set method='click'"#;

/// The `jobId` query parameter of the review page URL.
pub fn job_id_from_review_url(review_url: &str) -> Option<String> {
    let url = url::Url::parse(review_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "jobId")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Posts a job and pays for its promotion.
///
/// Confirms the payment with a one-time password from `otp`.
pub struct JobPromotion {
    otp: Arc<dyn OtpSource>,
}

impl JobPromotion {
    pub fn new(otp: Arc<dyn OtpSource>) -> Self {
        Self { otp }
    }

    async fn run_steps(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput, steps: &[Step]) -> Result<()> {
        for step in steps {
            match step {
                Step::Act(instruction) => ctx.executor.act(instruction).await?,
                Step::ActUncached(instruction) => ctx.executor.act_uncached(instruction).await?,
                Step::Fill(instruction, field) => {
                    let value = match *field {
                        "budget" => budget(input),
                        field => text_field(input, field)?,
                    };
                    ctx.executor.perform(instruction, Mode::Fill(&value)).await?;
                }
                Step::Keys(keys, settle) => {
                    ctx.settle(*settle).await?;
                    for key in *keys {
                        ctx.press(key).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Post the job and read its id off the review page.
    async fn create_posting(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<String> {
        ctx.backend().goto(POSTED_JOBS_URL).await?;
        ctx.executor.act(POST_FREE_JOB).await?;
        ctx.executor.fill(JOB_TITLE_FIELD, &text_field(input, "job_title")?).await?;
        ctx.press("Tab").await?;
        ctx.settle(5_000).await?;

        // The page often navigates before the click is acknowledged.
        if let Err(e) = ctx.executor.act(POST_JOB).await {
            tracing::warn!(error = %e, "ignoring failure on initial post job click");
        }

        let review_url = ctx.backend().current_url().await?;
        job_id_from_review_url(&review_url).ok_or_else(|| {
            AutomationError::Workflow(format!("unable to extract jobId from review URL {}", review_url))
        })
    }

    async fn clear_qualifications(&self, ctx: &WorkflowContext<'_>) -> Result<()> {
        ctx.settle(10_000).await?;
        let editors = ctx.executor.observe_all(QUALIFICATION_EDITORS_INSTRUCTION).await?;
        if editors.is_empty() {
            return Err(AutomationError::Workflow("no qualification text editors found".into()));
        }

        tracing::debug!(count = editors.len(), "clearing qualification editors");
        for editor in &editors {
            ctx.backend().click(&editor.selector).await?;
            ctx.settle(300).await?;
            ctx.press("Meta+A").await?;
            ctx.settle(100).await?;
            ctx.press("Backspace").await?;
        }
        Ok(())
    }

    async fn enter_card(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<()> {
        let mut last_error = None;
        for attempt in 1..=CARD_ENTRY_ATTEMPTS {
            match self.try_enter_card(ctx, input).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "card entry failed");
                    last_error = Some(e);
                    ctx.settle(2_000).await?;
                }
            }
        }
        Err(AutomationError::Workflow(format!(
            "card entry failed after {} attempts: {}",
            CARD_ENTRY_ATTEMPTS,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn try_enter_card(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<()> {
        let backend = ctx.backend();
        for (selector, field) in [
            (CARD_NUMBER_SELECTOR, "card_number"),
            (CARD_EXPIRATION_SELECTOR, "card_expiration"),
            (CARD_CSC_SELECTOR, "card_security_code"),
        ] {
            backend
                .fill_in_frame(CARD_FRAME_SELECTOR, selector, &text_field(input, field)?)
                .await?;
        }
        for _ in 0..3 {
            ctx.press("Tab").await?;
            ctx.settle(150).await?;
        }
        backend.type_text(&text_field(input, "card_postal_code")?).await
    }

    async fn confirm_with_otp(&self, ctx: &WorkflowContext<'_>) -> Result<()> {
        ctx.settle(20_000).await?;
        let otp = self.otp.latest_otp().await?.ok_or_else(|| {
            AutomationError::ExternalDependency("no OTP found in recent messages".into())
        })?;
        tracing::info!(sender = %otp.sender, "one-time password received");

        ctx.executor.fill(OTP_FIELD, &otp.code).await?;
        ctx.executor.act(SUBMIT_OTP).await
    }
}

fn budget(input: &WorkflowInput) -> String {
    text_field(input, "budget").unwrap_or_else(|_| DEFAULT_BUDGET.to_string())
}

#[async_trait]
impl Workflow for JobPromotion {
    fn name(&self) -> &'static str {
        PROMOTION_WORKFLOW
    }

    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED
    }

    async fn execute(&self, ctx: &WorkflowContext<'_>, input: &WorkflowInput) -> Result<Value> {
        let job_id = self.create_posting(ctx, input).await?;
        tracing::info!(job_id = %job_id, "posting created");

        self.run_steps(ctx, input, DETAILS).await?;
        self.clear_qualifications(ctx).await?;
        self.run_steps(ctx, input, PLAN).await?;

        self.enter_card(ctx, input).await?;
        ctx.executor.act(ADD_CARD).await?;
        ctx.executor.act(PROMOTE_JOB).await?;
        self.confirm_with_otp(ctx).await?;

        Ok(json!({
            "jobDetailUrl": job_detail_url(&job_id),
            "jobId": job_id,
            "jobState": "In review",
            "status": "submitted",
        }))
    }
}
