//! Batch processing over many work items.
//!
//! - [`BatchOrchestrator`]: resumable, one-at-a-time processing with a summary
//! - [`ids`]: assembling the id list from arguments and files
//! - [`enrichment`]: lookup tables attached to extracted postings
//! - [`campaign`]: promotion across target countries

pub mod campaign;
pub mod enrichment;
pub mod ids;
mod orchestrator;

pub use campaign::{load_templates, Campaign, CampaignReport, Template};
pub use enrichment::{ApplyUrlIndex, JobEnricher, JobTitleIndex};
pub use ids::{collect_ids, dedup_ids, load_ids_from_file};
pub use orchestrator::{BatchOrchestrator, BatchRun};
