//! Promote every input template once per target country, then move each
//! resulting posting to its country.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::enrichment::JobTitleIndex;
use crate::error::{AutomationError, Result};
use crate::workflows::{
    job_detail_url, write_record, JobEditCountry, RunRecord, Workflow, WorkflowInput,
    WorkflowRunner, PROMOTION_WORKFLOW,
};

/// Input file kept next to the templates that is not a promotion template.
pub const EDIT_COUNTRY_SAMPLE: &str = "linkedin_edit_country_sample.json";

/// A promotion input, keyed by its job title.
#[derive(Debug, Clone)]
pub struct Template {
    pub job_title: String,
    pub path: PathBuf,
    pub payload: WorkflowInput,
}

/// Record of one location change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Detail page that was edited.
    pub input: String,
    pub country: String,
    pub output: Value,
}

#[derive(Debug, Default)]
pub struct CampaignReport {
    pub promotion_records: Vec<PathBuf>,
    pub promotion_failures: usize,
    pub location_records: Vec<PathBuf>,
    pub location_failures: usize,
}

/// Load every `*.json` template in `inputs_dir`, keyed by `job_title`.
///
/// Files without a `job_title` are ignored. When two files share a title the
/// later one in name order wins.
pub async fn load_templates(inputs_dir: &Path) -> Result<Vec<Template>> {
    let mut entries = match tokio::fs::read_dir(inputs_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AutomationError::ExternalDependency(format!(
                "inputs directory not found: {}",
                inputs_dir.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|e| e == "json");
        if is_json && entry.file_name() != EDIT_COUNTRY_SAMPLE {
            paths.push(path);
        }
    }
    paths.sort();

    let mut templates = BTreeMap::new();
    for path in paths {
        let content = tokio::fs::read_to_string(&path).await?;
        let payload: WorkflowInput = match serde_json::from_str(&content) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable template");
                continue;
            }
        };
        let Some(job_title) = payload
            .get("job_title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        templates.insert(
            job_title.clone(),
            Template {
                job_title,
                path,
                payload,
            },
        );
    }
    Ok(templates.into_values().collect())
}

fn underscored(text: &str) -> String {
    text.replace(' ', "_")
}

/// Runs the two-phase promotion campaign.
pub struct Campaign<'a> {
    runner: &'a WorkflowRunner,
    promotion: &'a dyn Workflow,
    titles: &'a JobTitleIndex,
}

impl<'a> Campaign<'a> {
    pub fn new(runner: &'a WorkflowRunner, promotion: &'a dyn Workflow, titles: &'a JobTitleIndex) -> Self {
        Self {
            runner,
            promotion,
            titles,
        }
    }

    /// Failed runs are logged and skipped; only setup errors and record
    /// writes abort the campaign.
    pub async fn run(&self, templates: &[Template]) -> Result<CampaignReport> {
        let mut report = CampaignReport::default();
        let runs_dir = &self.runner.config().runs_dir;

        let mut promoted = Vec::with_capacity(templates.len());
        for template in templates {
            let outputs = self.promote(template, runs_dir, &mut report).await?;
            promoted.push((template, outputs));
        }

        for (template, outputs) in promoted {
            let countries = self.titles.countries(&template.job_title);
            for (country, output) in countries.iter().zip(outputs) {
                self.relocate(template, country, &output, runs_dir, &mut report)
                    .await?;
            }
        }

        tracing::info!(
            promotions = report.promotion_records.len(),
            promotion_failures = report.promotion_failures,
            locations = report.location_records.len(),
            location_failures = report.location_failures,
            "campaign finished"
        );
        Ok(report)
    }

    /// One promotion per listed country, at least one. Returns successful outputs.
    async fn promote(
        &self,
        template: &Template,
        runs_dir: &Path,
        report: &mut CampaignReport,
    ) -> Result<Vec<Value>> {
        let run_count = self.titles.countries(&template.job_title).len().max(1);
        let mut outputs = Vec::new();

        for run in 1..=run_count {
            tracing::info!(job_title = %template.job_title, "posting job run {}/{}", run, run_count);
            let output = match self.runner.run(self.promotion, &template.payload).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(job_title = %template.job_title, run, error = %e, "promotion failed");
                    report.promotion_failures += 1;
                    continue;
                }
            };

            let record = RunRecord::new(
                PROMOTION_WORKFLOW,
                Value::Object(template.payload.clone()),
                output.clone(),
            );
            let path = runs_dir.join(format!(
                "{}_promotion_run{}.json",
                underscored(&template.job_title),
                run
            ));
            write_record(&path, &record).await?;
            report.promotion_records.push(path);
            outputs.push(output);
        }
        Ok(outputs)
    }

    async fn relocate(
        &self,
        template: &Template,
        country: &str,
        promotion_output: &Value,
        runs_dir: &Path,
        report: &mut CampaignReport,
    ) -> Result<()> {
        let Some(job_id) = promotion_output.get("jobId").and_then(Value::as_str) else {
            return Ok(());
        };
        let url = job_detail_url(job_id);
        let input = json!({"job_detail_url": url, "employee_location": country});
        let Value::Object(input) = input else {
            return Ok(());
        };

        tracing::info!(url = %url, country, "updating job location");
        let output = match self.runner.run(&JobEditCountry, &input).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(url = %url, country, error = %e, "location update failed");
                report.location_failures += 1;
                return Ok(());
            }
        };

        let path = runs_dir.join(format!(
            "{}_location_{}.json",
            underscored(&template.job_title),
            underscored(country)
        ));
        let record = LocationRecord {
            input: url,
            country: country.to_string(),
            output,
        };
        write_record(&path, &record).await?;
        report.location_records.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, MockOtpSource};
    use crate::types::config::AutomationConfig;
    use crate::workflows::{JobPromotion, JOB_STATE_INSTRUCTION};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_templates_skips_sample_and_untitled() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, value: Value| {
            std::fs::write(dir.path().join(name), value.to_string()).unwrap();
        };
        write("analyst.json", json!({"job_title": "Data Analyst", "apply_url": "https://a"}));
        write("engineer.json", json!({"job_title": "Backend Engineer"}));
        write(EDIT_COUNTRY_SAMPLE, json!({"job_title": "Sample"}));
        write("notes.json", json!({"comment": "no title"}));
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let templates = load_templates(dir.path()).await.unwrap();
        let titles: Vec<_> = templates.iter().map(|t| t.job_title.as_str()).collect();

        assert_eq!(titles, vec!["Backend Engineer", "Data Analyst"]);
    }

    #[tokio::test]
    async fn test_missing_inputs_dir() {
        let err = load_templates(Path::new("/nonexistent/inputs")).await.unwrap_err();
        assert!(matches!(err, AutomationError::ExternalDependency(_)));
    }

    /// Promotion stand-in that hands out sequential job ids.
    struct NumberedPromotion {
        next: std::sync::atomic::AtomicU32,
        fail_runs: Vec<u32>,
    }

    #[async_trait::async_trait]
    impl Workflow for NumberedPromotion {
        fn name(&self) -> &'static str {
            PROMOTION_WORKFLOW
        }

        fn required_fields(&self) -> &'static [&'static str] {
            &["job_title"]
        }

        async fn execute(&self, _ctx: &crate::workflows::WorkflowContext<'_>, _input: &WorkflowInput) -> Result<Value> {
            let n = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            if self.fail_runs.contains(&n) {
                return Err(AutomationError::Workflow("checkout failed".into()));
            }
            Ok(json!({"jobId": format!("{}", 9000 + n), "status": "submitted"}))
        }
    }

    #[tokio::test]
    async fn test_campaign_promotes_per_country_then_relocates() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutomationConfig::immediate(dir.path());
        let backend = Arc::new(
            MockBackend::new()
                .resolve_everything()
                .with_extraction(JOB_STATE_INSTRUCTION, json!({"extraction": "Active"})),
        );
        let runner = WorkflowRunner::new(backend.clone(), config.clone());
        let titles = JobTitleIndex::from_csv(
            "job_title,original_title,countries\nData Analyst,Analyst II,\"India,United States\"\nChef,Cook,\n",
        )
        .unwrap();
        let promotion = NumberedPromotion {
            next: Default::default(),
            fail_runs: vec![],
        };
        let templates = vec![
            Template {
                job_title: "Chef".into(),
                path: PathBuf::from("chef.json"),
                payload: json!({"job_title": "Chef"}).as_object().cloned().unwrap(),
            },
            Template {
                job_title: "Data Analyst".into(),
                path: PathBuf::from("analyst.json"),
                payload: json!({"job_title": "Data Analyst"}).as_object().cloned().unwrap(),
            },
        ];

        let report = Campaign::new(&runner, &promotion, &titles)
            .run(&templates)
            .await
            .unwrap();

        // Chef: one run, no countries; Data Analyst: one run per country
        assert_eq!(report.promotion_records.len(), 3);
        assert_eq!(report.location_records.len(), 2);
        assert!(config.runs_dir.join("Chef_promotion_run1.json").exists());
        assert!(config.runs_dir.join("Data_Analyst_promotion_run2.json").exists());
        assert!(config.runs_dir.join("Data_Analyst_location_United_States.json").exists());

        let record: LocationRecord = serde_json::from_str(
            &std::fs::read_to_string(config.runs_dir.join("Data_Analyst_location_India.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(record.input, "https://www.linkedin.com/hiring/jobs/9002/detail/");
        assert_eq!(record.output["status"], "updated");
    }

    #[tokio::test]
    async fn test_failed_promotion_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutomationConfig::immediate(dir.path());
        let backend = Arc::new(
            MockBackend::new()
                .resolve_everything()
                .with_extraction(JOB_STATE_INSTRUCTION, json!({"extraction": "Active"})),
        );
        let runner = WorkflowRunner::new(backend, config.clone());
        let titles = JobTitleIndex::from_csv(
            "job_title,original_title,countries\nData Analyst,Analyst II,\"India,Brazil\"\n",
        )
        .unwrap();
        let promotion = NumberedPromotion {
            next: Default::default(),
            fail_runs: vec![1],
        };
        let templates = vec![Template {
            job_title: "Data Analyst".into(),
            path: PathBuf::from("analyst.json"),
            payload: json!({"job_title": "Data Analyst"}).as_object().cloned().unwrap(),
        }];

        let report = Campaign::new(&runner, &promotion, &titles)
            .run(&templates)
            .await
            .unwrap();

        assert_eq!(report.promotion_failures, 1);
        assert_eq!(report.promotion_records.len(), 1);
        // the surviving posting is paired with the first country
        assert_eq!(report.location_records.len(), 1);
        assert!(config.runs_dir.join("Data_Analyst_location_India.json").exists());
    }

    #[tokio::test]
    async fn test_real_promotion_workflow_plugs_in() {
        let dir = tempfile::tempdir().unwrap();
        let runner = WorkflowRunner::new(
            Arc::new(MockBackend::new()),
            AutomationConfig::immediate(dir.path()),
        );
        let promotion = JobPromotion::new(Arc::new(MockOtpSource::empty()));
        let titles = JobTitleIndex::default();
        let templates = vec![Template {
            job_title: "Chef".into(),
            path: PathBuf::from("chef.json"),
            payload: json!({"job_title": "Chef"}).as_object().cloned().unwrap(),
        }];

        // template lacks the card fields, so the single run fails validation
        let report = Campaign::new(&runner, &promotion, &titles)
            .run(&templates)
            .await
            .unwrap();
        assert_eq!(report.promotion_failures, 1);
        assert!(report.location_records.is_empty());
    }
}
