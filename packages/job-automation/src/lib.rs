//! Job Posting Automation Library
//!
//! Drives an AI browser agent through job-board workflows (extract a posting,
//! promote a new posting, change a posting's location) and runs those
//! workflows over many items without redoing finished work.
//!
//! # Design Philosophy
//!
//! **"Ask once, remember the answer"**
//!
//! - Natural-language instructions are resolved to selectors by the agent
//! - Resolved selectors are cached per workflow and trusted until they fail
//! - A failing cached selector is re-resolved fresh and the cache heals itself
//! - Batches are resumable: an item with an artifact on disk is done
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use job_automation::{
//!     AutomationConfig, BatchOrchestrator, FsArtifactStore, JobExtract, WorkItem,
//!     WorkflowProcessor, WorkflowRunner,
//! };
//! use job_automation::testing::MockBackend;
//!
//! let config = AutomationConfig::from_root(".");
//! let backend = Arc::new(MockBackend::new().resolve_everything());
//! let runner = Arc::new(WorkflowRunner::new(backend, config.clone()));
//!
//! let store = Arc::new(FsArtifactStore::new(config.output_dir.clone()));
//! let processor = WorkflowProcessor::new(runner, Arc::new(JobExtract), "jobId");
//! let run = BatchOrchestrator::new(store)
//!     .run(WorkItem::from_ids(["4098765", "4098766"]), &processor, false)
//!     .await?;
//! println!("{} succeeded", run.summary.successful);
//! ```
//!
//! # Modules
//!
//! - [`executor`] - Cached-then-fresh action execution with bounded retries
//! - [`cache`] - Persistent instruction → selector cache
//! - [`workflows`] - Workflow trait, runner and the job-board workflows
//! - [`batch`] - Resumable batch orchestration, id lists, enrichment, campaigns
//! - [`stores`] - Artifact stores (filesystem, memory)
//! - [`otp`] - One-time passwords from a local message database
//! - [`testing`] - Mock backend and OTP source

#[cfg(feature = "stagehand")]
pub mod backends;
pub mod batch;
pub mod cache;
pub mod error;
pub mod executor;
pub mod otp;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod workflows;

// Re-export core types at crate root
pub use error::{AutomationError, ErrorKind, IdListError, Result};
pub use traits::{
    backend::UiBackend,
    otp::{Otp, OtpSource},
    processor::{BatchObserver, Enricher, ItemProcessor, TracingObserver},
    store::ArtifactStore,
};
pub use types::{
    batch::{BatchResult, BatchSummary, WorkItem},
    config::{AutomationConfig, RetryPolicy},
    descriptor::ActionDescriptor,
};

pub use cache::ActionCache;
pub use executor::{AttemptMachine, AttemptPhase, CachePolicy, Mode, ResilientExecutor};

// Re-export workflows
pub use workflows::{
    save_run_record, JobEditCountry, JobExtract, JobPostingSnapshot, JobPromotion, RunRecord,
    Workflow, WorkflowContext, WorkflowInput, WorkflowProcessor, WorkflowRunner,
};

// Re-export batch layer
pub use batch::{
    collect_ids, load_templates, BatchOrchestrator, BatchRun, Campaign, CampaignReport,
    JobEnricher, JobTitleIndex,
};

// Re-export stores
pub use stores::{FsArtifactStore, MemoryArtifactStore};

pub use otp::MessagesOtpSource;

#[cfg(feature = "stagehand")]
pub use backends::StagehandBackend;

// Re-export testing utilities
pub use testing::{MockBackend, MockOtpSource};
