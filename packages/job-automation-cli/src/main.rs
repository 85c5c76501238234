//! Job posting automation CLI
//!
//! Opens one browser session per invocation, runs the requested workflow or
//! batch through it, and closes it again.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use job_automation::batch::{load_templates, Campaign, JobEnricher, JobTitleIndex};
use job_automation::workflows::{EDIT_COUNTRY_WORKFLOW, PROMOTION_WORKFLOW};
use job_automation::{
    collect_ids, save_run_record, AutomationConfig, BatchOrchestrator, BatchRun, FsArtifactStore,
    JobEditCountry, JobExtract, JobPromotion, MessagesOtpSource, StagehandBackend, UiBackend,
    WorkItem, Workflow, WorkflowInput, WorkflowProcessor, WorkflowRunner,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "job-automation")]
#[command(about = "Browser-agent automation for job postings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract posting statistics for many job ids, resuming previous runs
    Extract {
        /// Job ids to extract
        #[arg(long, num_args = 1..)]
        job_ids: Vec<String>,

        /// JSON or text file with job ids
        #[arg(long)]
        job_ids_file: Option<PathBuf>,

        /// Where artifacts and the summary are written
        #[arg(long, default_value = "linked_job_posts")]
        output_dir: PathBuf,

        /// Re-extract ids that already have an artifact
        #[arg(long)]
        force: bool,
    },

    /// Post and promote one job from an input template
    Promote { input: PathBuf },

    /// Change the employee location of one posting
    EditCountry { input: PathBuf },

    /// Promote every input template once per target country, then relocate each posting
    RunAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_automation=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let automation = config.automation();

    // Resolve ids before a browser session is opened
    let ids = match &cli.command {
        Commands::Extract {
            job_ids,
            job_ids_file,
            ..
        } => collect_ids(job_ids, job_ids_file.as_deref())
            .await
            .context("no job ids to extract")?,
        _ => Vec::new(),
    };

    let backend = StagehandBackend::connect(config.client(), &config.session())
        .await
        .context("Failed to start browser session")?;
    let backend: Arc<dyn UiBackend> = Arc::new(backend);
    let runner = Arc::new(WorkflowRunner::new(backend.clone(), automation.clone()));

    let result = match cli.command {
        Commands::Extract {
            output_dir, force, ..
        } => {
            let output_dir = config.automation_root.join(output_dir);
            cmd_extract(runner, &automation, ids, output_dir, force).await
        }
        Commands::Promote { input } => {
            let promotion = JobPromotion::new(Arc::new(MessagesOtpSource::new(&config.messages_db_path)));
            cmd_single(&runner, &promotion, PROMOTION_WORKFLOW, &input).await
        }
        Commands::EditCountry { input } => {
            cmd_single(&runner, &JobEditCountry, EDIT_COUNTRY_WORKFLOW, &input).await
        }
        Commands::RunAll => cmd_run_all(&runner, &config, &automation).await,
    };

    if let Err(e) = backend.close().await {
        tracing::warn!(error = %e, "failed to close browser session");
    }
    result
}

async fn cmd_extract(
    runner: Arc<WorkflowRunner>,
    automation: &AutomationConfig,
    ids: Vec<String>,
    output_dir: PathBuf,
    force: bool,
) -> Result<()> {
    tracing::info!(count = ids.len(), output_dir = %output_dir.display(), force, "extracting postings");

    let enricher = JobEnricher::load(&automation.titles_csv, &automation.runs_dir)
        .await
        .context("Failed to load enrichment tables")?;
    let processor = WorkflowProcessor::new(runner, Arc::new(JobExtract), "jobId");

    let run = BatchOrchestrator::new(Arc::new(FsArtifactStore::new(output_dir.clone())))
        .with_item_pause(automation.item_pause)
        .with_enricher(Arc::new(enricher))
        .run(WorkItem::from_ids(ids), &processor, force)
        .await
        .context("Batch aborted")?;

    print_tally(&run, &output_dir);
    Ok(())
}

fn print_tally(run: &BatchRun, output_dir: &Path) {
    let summary = &run.summary;
    println!();
    println!("Requested:  {}", summary.total_requested);
    println!("Skipped:    {}", summary.skipped_existing);
    println!("Processed:  {}", summary.processed);
    println!("Successful: {}", summary.successful);
    println!("Failed:     {}", summary.failed);
    for (id, error) in summary.failures() {
        println!("  {} - {}", id, error);
    }
    if run.summary_written {
        println!("Results in {}", output_dir.display());
    } else if run.results().is_empty() {
        println!("Nothing to process; every id already has a result (use --force to redo)");
    } else {
        println!("Summary could not be written to {}", output_dir.display());
    }
}

async fn read_input(path: &Path) -> Result<WorkflowInput> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str::<Value>(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?
    {
        Value::Object(input) => Ok(input),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

async fn cmd_single(
    runner: &WorkflowRunner,
    workflow: &dyn Workflow,
    record_name: &str,
    input_path: &Path,
) -> Result<()> {
    let input = read_input(input_path).await?;
    let output = runner
        .run(workflow, &input)
        .await
        .with_context(|| format!("{} failed", workflow.name()))?;

    let path = save_run_record(
        &runner.config().runs_dir,
        record_name,
        Value::Object(input),
        output.clone(),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    println!("Run record: {}", path.display());
    Ok(())
}

async fn cmd_run_all(runner: &WorkflowRunner, config: &Config, automation: &AutomationConfig) -> Result<()> {
    let titles = JobTitleIndex::load(&automation.titles_csv)
        .await
        .context("Job title table is required for run-all")?;
    let templates = load_templates(&automation.inputs_dir).await?;
    if templates.is_empty() {
        bail!("no input templates found in {}", automation.inputs_dir.display());
    }

    let promotion = JobPromotion::new(Arc::new(MessagesOtpSource::new(&config.messages_db_path)));
    let report = Campaign::new(runner, &promotion, &titles).run(&templates).await?;

    println!();
    println!(
        "Promotions: {} recorded, {} failed",
        report.promotion_records.len(),
        report.promotion_failures
    );
    println!(
        "Locations:  {} recorded, {} failed",
        report.location_records.len(),
        report.location_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_arguments() {
        let cli = Cli::try_parse_from([
            "job-automation",
            "extract",
            "--job-ids",
            "4098765",
            "4098766",
            "--force",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                job_ids,
                job_ids_file,
                output_dir,
                force,
            } => {
                assert_eq!(job_ids, vec!["4098765", "4098766"]);
                assert!(job_ids_file.is_none());
                assert_eq!(output_dir, PathBuf::from("linked_job_posts"));
                assert!(force);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_single_workflow_requires_input() {
        assert!(Cli::try_parse_from(["job-automation", "promote"]).is_err());
        assert!(Cli::try_parse_from(["job-automation", "edit-country", "in.json"]).is_ok());
        assert!(Cli::try_parse_from(["job-automation", "run-all"]).is_ok());
    }

    #[tokio::test]
    async fn test_input_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        tokio::fs::write(&path, "[1, 2]").await.unwrap();

        assert!(read_input(&path).await.is_err());

        tokio::fs::write(&path, r#"{"job_title": "Analyst"}"#).await.unwrap();
        let input = read_input(&path).await.unwrap();
        assert_eq!(input["job_title"], "Analyst");
    }
}
